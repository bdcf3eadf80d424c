pub mod customers;
pub mod installments;
pub mod leads;
pub mod products;
pub mod reports;
pub mod sales;

use rust_decimal::Decimal;
use validator::ValidationError;

// Validação compartilhada pelos payloads com valores monetários.
pub(crate) fn validate_not_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut error = ValidationError::new("range");
        error.add_param("min".into(), &0.0);
        error.message = Some("O valor não pode ser negativo.".into());
        return Err(error);
    }
    Ok(())
}
