use crate::domain::account::AccountNumber;
use crate::domain::ports::AccountNumberGenerator;
use crate::error::Result;
use rand::Rng;

/// Draws ten random digits and formats them as `DD-DDDD-DDDD`.
///
/// Uniqueness is not checked here; the store rejects collisions and the
/// caller draws again.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAccountNumberGenerator;

impl RandomAccountNumberGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl AccountNumberGenerator for RandomAccountNumberGenerator {
    fn generate(&self) -> Result<AccountNumber> {
        let mut rng = rand::thread_rng();
        let mut digits = [0u8; AccountNumber::DIGITS];
        for digit in digits.iter_mut() {
            *digit = rng.gen_range(0..10);
        }
        AccountNumber::from_digits(digits)
    }
}
