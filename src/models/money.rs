//! Paise amount helpers.
//!
//! All monetary values in the system are integer paise (1 rupee = 100 paise)
//! stored as `i64`. Floats never touch money.

/// A monetary amount in paise.
///
/// Signed: ledger entries use negative values for money leaving a wallet.
pub type Paise = i64;

/// Format a paise amount as rupees with Indian digit grouping.
///
/// Used wherever amounts appear in human-readable messages, most notably
/// insufficient-balance errors.
///
/// # Examples
///
/// - `50` becomes `₹0.50`
/// - `100_000` becomes `₹1,000.00`
/// - `-50_050` becomes `-₹500.50`
pub fn format_paise(amount: Paise) -> String {
    let abs = amount.unsigned_abs();
    let rupees = group_indian(&(abs / 100).to_string());
    let paise = abs % 100;
    if amount < 0 {
        format!("-₹{rupees}.{paise:02}")
    } else {
        format!("₹{rupees}.{paise:02}")
    }
}

/// Indian grouping: the last three digits form one group, every group before
/// that has two digits (12,34,56,789).
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut parts = Vec::new();
    let mut i = head.len();
    while i > 2 {
        parts.push(&head[i - 2..i]);
        i -= 2;
    }
    parts.push(&head[..i]);
    parts.reverse();
    format!("{},{}", parts.join(","), tail)
}
