use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parser::BillDetail;

/// One billing number to look up, as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingItem {
    pub billing_no: String,
    pub subscription_no: String,
}

/// Authenticated portal state: the flattened login cookies plus the
/// device number scraped from the subscriber's service page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub cookies: String,
    pub device_no: String,
}

/// Outcome for a single billing item. `Failed` keeps the caller's
/// numbers so degraded entries stay attributable in the result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BillRecord {
    Failed(BillFailure),
    Detail(Bill),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<i64>,
    pub billing_no: String,
    pub subscription_no: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillFailure {
    pub error: String,
    pub id: String,
    pub billing_no: String,
    pub subscription_no: String,
}

impl BillRecord {
    pub fn from_detail(detail: BillDetail, item: &BillingItem) -> Self {
        BillRecord::Detail(Bill {
            name: detail.name,
            period: detail.period,
            year: detail.year,
            amount: detail.amount,
            fee: detail.fee,
            billing_no: item.billing_no.clone(),
            subscription_no: item.subscription_no.clone(),
            id: Uuid::new_v4().to_string(),
        })
    }

    pub fn failed(error: impl Into<String>, item: &BillingItem) -> Self {
        BillRecord::Failed(BillFailure {
            error: error.into(),
            id: Uuid::new_v4().to_string(),
            billing_no: item.billing_no.clone(),
            subscription_no: item.subscription_no.clone(),
        })
    }

    pub fn billing_no(&self) -> &str {
        match self {
            BillRecord::Detail(bill) => &bill.billing_no,
            BillRecord::Failed(failure) => &failure.billing_no,
        }
    }

    pub fn subscription_no(&self) -> &str {
        match self {
            BillRecord::Detail(bill) => &bill.subscription_no,
            BillRecord::Failed(failure) => &failure.subscription_no,
        }
    }
}

impl Display for BillRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillRecord::Detail(bill) => write!(f, "{}", bill),
            BillRecord::Failed(failure) => write!(f, "{}", failure),
        }
    }
}

impl Display for Bill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{}]", self.billing_no, self.subscription_no)?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        if let Some(period) = &self.period {
            write!(f, ", {}", period)?;
        }
        if let Some(year) = &self.year {
            write!(f, " {}", year)?;
        }
        if let Some(amount) = self.amount {
            write!(f, ": {} SYP", amount)?;
        }
        if let Some(fee) = self.fee {
            write!(f, " (fee {})", fee)?;
        }
        Ok(())
    }
}

impl Display for BillFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {}",
            self.billing_no, self.subscription_no, self.error
        )
    }
}
