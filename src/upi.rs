//! UPI deep-link construction. The link itself (`upi://pay?...`) is the
//! whole integration surface: any UPI app on the student's phone resolves
//! it. Rendering the link as a QR image is the client's concern.

/// Percent-encode a query value. Unreserved characters pass through;
/// everything else, spaces included, is `%HH`-escaped.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// A generated payment link plus the fields the page displays alongside it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UpiLink {
    pub upi_link: String,
    pub transaction_ref: String,
    pub amount: String,
    pub upi_id: String,
    pub payee_name: String,
}

/// Build the deep link for settling a bill. The transaction reference is
/// scoped by mess and bill so reconciliation stays unambiguous across
/// tenants.
pub fn payment_link(
    upi_id: &str,
    payee_name: &str,
    amount: f64,
    bill_id: i64,
    mess_id: i64,
    roll_no: &str,
    stamp: &str,
) -> UpiLink {
    let transaction_ref = format!("M{mess_id}-BILL{bill_id}-{stamp}");
    let amount_str = format!("{amount:.2}");
    let note = format!("Mess Bill #{bill_id} - {roll_no}");

    let upi_link = format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR&tn={}&tr={}",
        upi_id,
        encode_component(payee_name),
        amount_str,
        encode_component(&note),
        transaction_ref,
    );

    UpiLink {
        upi_link,
        transaction_ref,
        amount: amount_str,
        upi_id: upi_id.to_string(),
        payee_name: payee_name.to_string(),
    }
}
