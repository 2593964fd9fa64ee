use rand::Rng;
use rand::distr::Alphanumeric;

/// Random hex token for single-use links (activation, password reset).
pub fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill(&mut buf[..]);
    hex::encode(buf)
}

/// Ticket code printed under an attendee's QR image: `SBX-` + 10 uppercase
/// alphanumerics.
pub fn ticket_code() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("SBX-{suffix}")
}
