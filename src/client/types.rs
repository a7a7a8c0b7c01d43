use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Credentials exchanged for a bearer token
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
  pub username: &'a str,
  pub password: &'a str,
}

/// Issued bearer token
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  pub access_token: String,
  #[serde(default)]
  pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageParseRequest<'a> {
  /// Base64-encoded image
  pub image: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextParseRequest<'a> {
  pub text: &'a str,
}

/// Transaction fields recognised from a receipt image or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
  pub date: String,
  pub amount: f64,
  pub merchant: String,
  pub payment_method: String,
  #[serde(default)]
  pub bank_name: String,
  #[serde(default)]
  pub card_last_four: String,
  pub transaction_type: String, // "expense" or "income"
  pub category: String,
  pub description: String,
}

/// Transaction to append to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
  pub date: String,
  pub amount: f64,
  pub merchant: String,
  pub payment_method: String,
  #[serde(default)]
  pub bank_name: String,
  #[serde(default)]
  pub card_last_four: String,
  pub transaction_type: String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

impl From<ParseResponse> for TransactionRequest {
  fn from(parsed: ParseResponse) -> Self {
    Self {
      date: parsed.date,
      amount: parsed.amount,
      merchant: parsed.merchant,
      payment_method: parsed.payment_method,
      bank_name: parsed.bank_name,
      card_last_four: parsed.card_last_four,
      transaction_type: parsed.transaction_type,
      category: Some(parsed.category),
      description: Some(parsed.description),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResponse {
  pub success: bool,
  pub message: String,
}

/// Balance per account, in the ledger's operating currency
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
  pub balances: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsResponse {
  pub accounts: Vec<String>,
}

/// Result of starting or stopping the ledger viewer
#[derive(Debug, Clone, Deserialize)]
pub struct FavaControlResponse {
  pub success: bool,
  pub message: String,
  #[serde(default)]
  pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavaStatus {
  pub running: bool,
  #[serde(default)]
  pub url: Option<String>,
}
