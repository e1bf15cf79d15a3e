//! Challenge code generation.

use rand::Rng;

pub(crate) const CODE_PREFIX: &str = "RSV-";
const CODE_LENGTH: usize = 8;
const ALPHABET_SIZE: u8 = 36;

/// `RSV-` followed by eight characters from `A-Z0-9`.
pub(crate) fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code = String::with_capacity(CODE_PREFIX.len() + CODE_LENGTH);
    code.push_str(CODE_PREFIX);

    for _ in 0..CODE_LENGTH {
        let n = rng.gen_range(0..ALPHABET_SIZE);

        code.push(char::from(if n < 26 { b'A' + n } else { b'0' + (n - 26) }));
    }

    code
}
