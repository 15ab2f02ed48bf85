use crate::domain::booking::BookingStatus;
use crate::domain::payment::PaymentStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One line of the final booking table.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct BookingRow {
    pub booking: String,
    pub customer: String,
    pub status: BookingStatus,
    /// Empty when the booking has no payment.
    pub payment_status: Option<PaymentStatus>,
    pub amount: Decimal,
    pub currency: Option<String>,
}

pub struct BookingWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BookingWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_bookings(&mut self, rows: Vec<BookingRow>) -> Result<(), csv::Error> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_rows() {
        let mut out = Vec::new();
        {
            let mut writer = BookingWriter::new(&mut out);
            writer
                .write_bookings(vec![BookingRow {
                    booking: "b1".to_string(),
                    customer: "alice".to_string(),
                    status: BookingStatus::StartService,
                    payment_status: Some(PaymentStatus::Pending),
                    amount: dec!(25.50),
                    currency: Some("USD".to_string()),
                }])
                .unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "booking,customer,status,payment_status,amount,currency\n\
             b1,alice,startservice,pending,25.50,USD\n"
        );
    }
}
