use crate::types::BillingItem;

// Fixed fields of the myData payload the sep endpoint expects. Only the
// device number and the billing key vary between requests.
const SERVICE_ID: &str = "STE_BILL";
const SERVICE_TYPE: &str = "postpaid";
const LANG: &str = "ar";

/// External billing key: `{city}_{billingNo}_{subscriptionNo}`. The
/// portal does its own validation, so none happens here.
pub fn billing_key(city: &str, item: &BillingItem) -> String {
    format!("{}_{}_{}", city, item.billing_no, item.subscription_no)
}

/// JSON body for one bill lookup. Sent URL-encoded as the `myData` form
/// field.
pub fn bill_payload(device_no: &str, billing_key: &str) -> String {
    serde_json::json!({
        "serviceId": SERVICE_ID,
        "serviceType": SERVICE_TYPE,
        "lang": LANG,
        "gsmNo": device_no,
        "values": [{ "billingNo": billing_key }],
    })
    .to_string()
}
