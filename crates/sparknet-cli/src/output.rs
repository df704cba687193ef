//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use sparknet_client::{Provider, Rental};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Registered providers.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderList {
    /// Providers in registration order.
    pub providers: Vec<Provider>,
}

impl TableDisplay for ProviderList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.providers.is_empty() {
            writeln!(writer, "No providers registered")?;
            return Ok(());
        }

        writeln!(writer, "{:<56}  {:<20}  {:>20}", "PROVIDER", "GPU", "PRICE / HOUR")?;
        writeln!(writer, "{}", "─".repeat(100))?;
        for provider in &self.providers {
            writeln!(
                writer,
                "{:<56}  {:<20}  {:>20}",
                provider.id.as_str(),
                truncate(&provider.gpu_model, 20),
                provider.price_per_hour.to_string()
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} provider(s)", self.providers.len())?;
        Ok(())
    }
}

/// Rentals for one address.
#[derive(Debug, Clone, Serialize)]
pub struct RentalList {
    /// The rentals.
    pub rentals: Vec<Rental>,
}

impl TableDisplay for RentalList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.rentals.is_empty() {
            writeln!(writer, "No rentals")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>6}  {:<56}  {:>5}  {:>20}  {:<9}",
            "ID", "PROVIDER", "HOURS", "COST", "STATE"
        )?;
        writeln!(writer, "{}", "─".repeat(104))?;
        for rental in &self.rentals {
            writeln!(
                writer,
                "{:>6}  {:<56}  {:>5}  {:>20}  {:<9}",
                rental.id,
                rental.provider.as_str(),
                rental.duration_hours,
                rental.total_cost.to_string(),
                rental_state(rental)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} rental(s)", self.rentals.len())?;
        Ok(())
    }
}

/// A single rental.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RentalDetail {
    /// The rental.
    pub rental: Rental,
}

impl TableDisplay for RentalDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let r = &self.rental;
        writeln!(writer, "Rental {}", r.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Consumer:   {}", r.consumer)?;
        writeln!(writer, "Provider:   {}", r.provider)?;
        writeln!(writer, "Hours:      {}", r.duration_hours)?;
        writeln!(writer, "Cost:       {}", r.total_cost)?;
        writeln!(writer, "Start:      {}", r.start_time)?;
        writeln!(writer, "End:        {}", r.end_time)?;
        writeln!(writer, "State:      {}", rental_state(r))?;
        Ok(())
    }
}

fn rental_state(rental: &Rental) -> &'static str {
    if rental.is_settled() {
        "settled"
    } else if rental.job_complete {
        "complete"
    } else if rental.is_active {
        "active"
    } else {
        "inactive"
    }
}

/// A confirmed transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TxReceipt {
    /// What was done.
    pub action: String,
    /// Transaction hash.
    pub hash: String,
    /// Ledger it was applied in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<u32>,
}

impl TableDisplay for TxReceipt {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ {}", self.action)?;
        writeln!(writer, "  Transaction: {}", self.hash)?;
        if let Some(ledger) = self.ledger {
            writeln!(writer, "  Ledger:      {ledger}")?;
        }
        Ok(())
    }
}

/// Result of a successful rent.
#[derive(Debug, Clone, Serialize)]
pub struct RentSummary {
    /// Allowance transaction hash.
    pub approval_hash: String,
    /// Rental transaction hash.
    pub rent_hash: String,
    /// The new rental.
    pub rental: Rental,
}

impl TableDisplay for RentSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ Rented {} for {} hour(s)", self.rental.provider, self.rental.duration_hours)?;
        writeln!(writer, "  Rental id:   {}", self.rental.id)?;
        writeln!(writer, "  Cost:        {}", self.rental.total_cost)?;
        writeln!(writer, "  Approval:    {}", self.approval_hash)?;
        writeln!(writer, "  Transaction: {}", self.rent_hash)?;
        Ok(())
    }
}

/// A freshly generated keypair.
#[derive(Debug, Clone, Serialize)]
pub struct KeyPairInfo {
    /// Account address.
    pub address: String,
    /// Secret seed.
    pub secret: String,
}

impl TableDisplay for KeyPairInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Address: {}", self.address)?;
        writeln!(writer, "Secret:  {}", self.secret)?;
        writeln!(writer)?;
        writeln!(writer, "Keep the secret private. Anyone holding it controls the account.")?;
        Ok(())
    }
}

/// Truncate a string to a maximum length in characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
