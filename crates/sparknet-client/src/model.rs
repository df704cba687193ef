//! Marketplace records as stored by the SparkNet contract.
//!
//! Both records arrive as symbol-keyed maps and are decoded by field name.
//! Monetary fields stay in raw stroops.

use crate::address::Address;
use crate::amount::Amount;
use crate::error::CodecError;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Seconds in one rental hour.
pub const SECS_PER_HOUR: u64 = 3600;

/// A registered compute provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider account.
    pub id: Address,
    /// Hardware description.
    pub gpu_model: String,
    /// Hourly price.
    pub price_per_hour: Amount,
    /// Ledger timestamp of registration.
    pub registered_at: u64,
}

impl Provider {
    /// Total cost of renting this provider for `hours`.
    #[must_use]
    pub fn cost_for(&self, hours: u64) -> Option<Amount> {
        self.price_per_hour.checked_mul(hours)
    }

    /// Encode as the contract stores it.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::record([
            ("gpu_model", Value::from(self.gpu_model.as_str())),
            ("id", Value::from(&self.id)),
            ("price_per_hour", Value::U128(self.price_per_hour.stroops())),
            ("registered_at", Value::U64(self.registered_at)),
        ])
    }
}

impl TryFrom<&Value> for Provider {
    type Error = CodecError;

    fn try_from(value: &Value) -> Result<Self, CodecError> {
        Ok(Self {
            id: value.field("id")?.as_address()?.clone(),
            gpu_model: value.field("gpu_model")?.as_str()?.to_string(),
            price_per_hour: Amount::from_stroops(value.field("price_per_hour")?.as_u128()?),
            registered_at: value.field("registered_at")?.as_u64()?,
        })
    }
}

/// A rental agreement between a consumer and a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    /// Rental id.
    pub id: u64,
    /// Paying account.
    pub consumer: Address,
    /// Provider account.
    pub provider: Address,
    /// Ledger timestamp when the rental started.
    pub start_time: u64,
    /// Ledger timestamp when the rental ends.
    pub end_time: u64,
    /// Rented hours.
    pub duration_hours: u64,
    /// Escrowed cost.
    pub total_cost: Amount,
    /// Rental is running.
    pub is_active: bool,
    /// Consumer marked the job complete.
    pub job_complete: bool,
    /// Payment released to the provider.
    pub is_paid: bool,
}

impl Rental {
    /// Job is complete and payment has been released.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.job_complete && self.is_paid
    }

    /// Whether `address` is a party to this rental.
    #[must_use]
    pub fn involves(&self, address: &Address) -> bool {
        self.consumer == *address || self.provider == *address
    }

    /// Rental length in seconds.
    #[must_use]
    pub const fn duration_secs(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Encode as the contract stores it.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::record([
            ("consumer", Value::from(&self.consumer)),
            ("duration_hours", Value::U64(self.duration_hours)),
            ("end_time", Value::U64(self.end_time)),
            ("id", Value::U64(self.id)),
            ("is_active", Value::Bool(self.is_active)),
            ("is_paid", Value::Bool(self.is_paid)),
            ("job_complete", Value::Bool(self.job_complete)),
            ("provider", Value::from(&self.provider)),
            ("start_time", Value::U64(self.start_time)),
            ("total_cost", Value::U128(self.total_cost.stroops())),
        ])
    }
}

impl TryFrom<&Value> for Rental {
    type Error = CodecError;

    fn try_from(value: &Value) -> Result<Self, CodecError> {
        Ok(Self {
            id: value.field("id")?.as_u64()?,
            consumer: value.field("consumer")?.as_address()?.clone(),
            provider: value.field("provider")?.as_address()?.clone(),
            start_time: value.field("start_time")?.as_u64()?,
            end_time: value.field("end_time")?.as_u64()?,
            duration_hours: value.field("duration_hours")?.as_u64()?,
            total_cost: Amount::from_stroops(value.field("total_cost")?.as_u128()?),
            is_active: value.field("is_active")?.as_bool()?,
            job_complete: value.field("job_complete")?.as_bool()?,
            is_paid: value.field("is_paid")?.as_bool()?,
        })
    }
}

/// Decode a `Vec` of records.
///
/// # Errors
///
/// Returns the first decoding error.
pub fn decode_list<T>(value: &Value) -> Result<Vec<T>, CodecError>
where
    T: for<'a> TryFrom<&'a Value, Error = CodecError>,
{
    value.as_vec()?.iter().map(T::try_from).collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;

    #[test]
    fn test_provider_decodes_by_name() {
        let provider = fixtures::provider(3, 25_000_000);
        let decoded = Provider::try_from(&provider.to_value()).expect("decode");
        assert_eq!(decoded, provider);
    }

    #[test]
    fn test_provider_price_not_rescaled() {
        let provider = fixtures::provider(3, 25_000_000);
        let decoded = Provider::try_from(&provider.to_value()).expect("decode");
        assert_eq!(decoded.price_per_hour.stroops(), 25_000_000);
        assert_eq!(decoded.price_per_hour.to_decimal_string(), "2.5");
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let provider = fixtures::provider(1, 7);
        let Value::Map(mut entries) = provider.to_value() else {
            panic!("expected map");
        };
        entries.reverse();
        let decoded = Provider::try_from(&Value::Map(entries)).expect("decode");
        assert_eq!(decoded, provider);
    }

    #[test]
    fn test_missing_field() {
        let value = Value::record([("id", Value::U64(1))]);
        let err = Rental::try_from(&value).expect_err("incomplete");
        assert!(matches!(err, CodecError::MissingField { .. }));
    }

    #[test]
    fn test_rental_roundtrip_and_helpers() {
        let consumer = fixtures::provider(1, 1).id;
        let provider = fixtures::provider(2, 1).id;
        let mut rental = fixtures::rental(9, &consumer, &provider);
        let decoded = Rental::try_from(&rental.to_value()).expect("decode");
        assert_eq!(decoded, rental);
        assert_eq!(rental.duration_secs(), 2 * SECS_PER_HOUR);
        assert!(rental.involves(&consumer));
        assert!(!rental.is_settled());

        rental.job_complete = true;
        rental.is_paid = true;
        assert!(rental.is_settled());
    }

    #[test]
    fn test_decode_list() {
        let list = Value::Vec(vec![
            fixtures::provider(1, 10).to_value(),
            fixtures::provider(2, 20).to_value(),
        ]);
        let providers: Vec<Provider> = decode_list(&list).expect("decode");
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[1].price_per_hour.stroops(), 20);
    }

    #[test]
    fn test_cost_for() {
        let provider = fixtures::provider(1, 25_000_000);
        assert_eq!(provider.cost_for(4), Some(Amount::from_stroops(100_000_000)));
    }
}
