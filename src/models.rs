// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub owner_rate_per_hour: Decimal,
    pub total_amount_pending: Decimal,
    pub total_amount_paid: Decimal,
    pub total_advances_given: Decimal,
    // rental bucket, never mixed with the harvesting totals above
    pub rental_amount_pending: Decimal,
    pub rental_amount_paid: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub machine_type: Option<String>,
    pub rate_per_hour: Decimal,
    pub owner_rate_per_hour: Decimal,
    pub total_amount_pending: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: i64,
    pub name: String,
    pub village: Option<String>,
    pub phone: Option<String>,
    pub total_amount_pending: Decimal,
    pub total_amount_paid: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dealer {
    pub id: i64,
    pub name: String,
    pub village: Option<String>,
    pub phone: Option<String>,
    pub total_amount_pending: Decimal,
    pub total_amount_paid: Decimal,
}

/// A harvesting job booked directly for a farmer.
///
/// `owner_rate_per_hour`, `net_amount_from_farmer` and `net_owner_amount` are
/// frozen when the job is written; reversals use these, not the machine's
/// current rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestingJob {
    pub id: i64,
    pub farmer_id: i64,
    pub machine_id: i64,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub rate_per_hour: Decimal,
    pub total_amount: Option<Decimal>,
    pub owner_rate_per_hour: Decimal,
    pub advance_from_farmer: Decimal,
    pub discount_to_farmer: Decimal,
    pub discount_from_owner: Decimal,
    pub net_amount_from_farmer: Decimal,
    pub net_owner_amount: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRental {
    pub id: i64,
    pub dealer_id: i64,
    pub machine_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub total_hours_used: Decimal,
    pub hourly_rate_to_dealer: Decimal,
    pub hourly_cost_from_owner: Decimal,
    pub total_amount_charged: Decimal,
    pub total_cost_to_owner: Decimal,
    // cache only, see ledger::rental_profit
    pub profit_margin: Decimal,
    pub advance_paid: Decimal,
    pub status: RentalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub payment_type: PaymentType,
    pub business_source: BusinessSource,
    pub owner_id: Option<i64>,
    pub farmer_id: Option<i64>,
    pub job_id: Option<i64>,
    pub date: NaiveDate,
    pub gross_amount: Decimal,
    pub discount_amount: Decimal,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalPayment {
    pub id: i64,
    pub rental_id: i64,
    pub dealer_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyExpense {
    pub id: i64,
    pub machine_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAdvance {
    pub id: i64,
    pub owner_id: i64,
    pub machine_id: Option<i64>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub note: Option<String>,
}

macro_rules! labelled_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.trim().eq_ignore_ascii_case($label) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(LedgerError::Validation(format!(
                    "Unknown {} '{}'",
                    stringify!($name),
                    s
                )))
            }
        }
    };
}

labelled_enum!(PaymentType {
    ToMachineOwner => "To Machine Owner",
    FromFarmer => "From Farmer",
});

labelled_enum!(BusinessSource {
    Harvesting => "harvesting",
    Rental => "rental",
});

labelled_enum!(PaymentStatus {
    Completed => "Completed",
    Pending => "Pending",
});

labelled_enum!(RentalStatus {
    Active => "Active",
    Completed => "Completed",
});
