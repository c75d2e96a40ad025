use rust_decimal::Decimal;

/// The folded statistics a [`FileTrailer`] carries, filled in by the
/// aggregator as the detail stream is consumed.
#[derive(Debug, Clone)]
pub struct TrailerStats {
    pub total_records: u64,
    pub total_amount: Decimal,
    pub average_risk_score: Decimal,
    pub unique_customers: u64,
}

/// Header fields written once, before the first detail record.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub master_id: i64,
    pub business_center_code: String,
    pub date: String,
    pub file_version: &'static str,
}
