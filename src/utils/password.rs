use rand::Rng;

/// Length of the credential generated for new accounts.
pub const GENERATED_PASSWORD_LEN: usize = 16;

// Ambiguous glyphs (0/O, 1/l/I) are left out.
const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// Generates a random initial password for an account created by an admin.
pub fn generate_password() -> String {
    let mut rng = rand::rng();
    (0..GENERATED_PASSWORD_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
