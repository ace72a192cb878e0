// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod advances;
pub mod config;
pub mod dashboard;
pub mod doctor;
pub mod expenses;
pub mod exporter;
pub mod importer;
pub mod jobs;
pub mod machines;
pub mod owners;
pub mod parties;
pub mod payments;
pub mod rentals;
pub mod reports;
