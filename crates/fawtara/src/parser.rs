use scraper::{ElementRef, Html, Selector};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Outage banners the portal embeds when the upstream provider is down
/// or overloaded. Either one aborts a whole fetch run.
pub const OUTAGE_BANNERS: [&str; 2] = [
    "عذراً الخدمة غير متاحة حالياً من جهة مزود الخدمة، الرجاء المحاولة لاحقاً",
    "عذراً يوجد ضغط على الخدمة من طرف مزود الخدمة، الرجاء المحاولة لاحقاً",
];

/// Per-item banner asking the caller to resubmit later. Degrades the one
/// bill instead of aborting the run.
pub const RESUBMIT_BANNER: &str =
    "عذراً، لم يتم تنفيذ طلبك لأسباب تقنية من طرف مزود الخدمة. الرجاء إعادة إرسال الطلب لاحقاً";

// Rejected logins come back as an alert fragment with a "danger" class.
const DANGER_MARKER: &str = "danger";

// The subscriber line sits in the sixth row of the bill panel, shaped as
// "<label>: <name>, <label>: <period> عام <year>".
const OWNER_ROW_INDEX: usize = 5;
const YEAR_LABEL: &str = "عام";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub token: String,
    pub captcha_id: String,
}

/// Scalar fields extracted from one bill detail page. Every field is
/// optional so malformed markup degrades the item, never the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillDetail {
    pub name: Option<String>,
    pub period: Option<String>,
    pub year: Option<String>,
    pub amount: Option<i64>,
    pub fee: Option<i64>,
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn input_value(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    document
        .select(&sel)
        .next()
        .and_then(|e| e.value().attr("value"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Pulls the CSRF token and captcha id out of the landing page form.
pub fn parse_login_form(html: &str) -> Result<LoginForm, ParseError> {
    let document = Html::parse_document(html);

    let token = input_value(&document, "#token")
        .ok_or_else(|| ParseError::MissingField("#token".to_string()))?;
    let captcha_id = input_value(&document, "#captchaId")
        .ok_or_else(|| ParseError::MissingField("#captchaId".to_string()))?;

    Ok(LoginForm { token, captcha_id })
}

/// Text of the first div in the fragment; the portal wraps every
/// human-readable status message in one.
pub fn parse_alert_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("div").unwrap();
    document
        .select(&sel)
        .next()
        .map(|e| normalize_whitespace(&elem_text(e)))
        .filter(|t| !t.is_empty())
}

/// Rejection message from the login response, if the portal flagged one.
pub fn parse_login_rejection(html: &str) -> Option<String> {
    if !html.contains(DANGER_MARKER) {
        return None;
    }
    Some(parse_alert_text(html).unwrap_or_else(|| normalize_whitespace(html)))
}

/// The subscriber's registered device number from the service page.
pub fn parse_device_no(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse(".selected-gsm").unwrap();
    document
        .select(&sel)
        .next()
        .and_then(|e| e.value().attr("value"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn find_outage_banner(html: &str) -> Option<String> {
    let banner = OUTAGE_BANNERS.iter().find(|b| html.contains(*b))?;
    Some(parse_alert_text(html).unwrap_or_else(|| (*banner).to_string()))
}

pub fn is_resubmit_banner(html: &str) -> bool {
    html.contains(RESUBMIT_BANNER)
}

/// Extracts the bill scalars from a detail page.
pub fn parse_bill_detail(html: &str) -> BillDetail {
    let document = Html::parse_document(html);
    let mut detail = BillDetail::default();

    let amount_sel = Selector::parse("input[data-amount]").unwrap();
    if let Some(input) = document.select(&amount_sel).next() {
        detail.amount = attr_int(input, "data-amount");
        detail.fee = attr_int(input, "data-fee");
    }

    let panel_sel = Selector::parse(".panel-body").unwrap();
    if let Some(panel) = document.select(&panel_sel).next()
        && let Some(row) = panel.child_elements().nth(OWNER_ROW_INDEX)
        && let Some(cell) = row.child_elements().last()
    {
        let line = normalize_whitespace(&elem_text(cell));
        let (name, period, year) = split_owner_line(&line);
        detail.name = name;
        detail.period = period;
        detail.year = year;
    }

    detail
}

fn attr_int(element: ElementRef, attr: &str) -> Option<i64> {
    element
        .value()
        .attr(attr)
        .and_then(|v| v.trim().parse().ok())
}

fn labeled_value(text: &str) -> Option<String> {
    text.split_once(':')
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_owner_line(line: &str) -> (Option<String>, Option<String>, Option<String>) {
    let (name_part, rest) = match line.split_once(',') {
        Some((name_part, rest)) => (name_part, Some(rest)),
        None => (line, None),
    };

    let name = labeled_value(name_part);

    let Some(rest) = rest else {
        return (name, None, None);
    };

    let (period_part, year_part) = match rest.split_once(YEAR_LABEL) {
        Some((period_part, year_part)) => (period_part, Some(year_part)),
        None => (rest, None),
    };

    let period = labeled_value(period_part);
    let year = year_part
        .map(|y| y.trim().to_string())
        .filter(|y| !y.is_empty());

    (name, period, year)
}
