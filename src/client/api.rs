use serde_json::Value;
use tracing::info;

use super::types::{
  AccountsResponse, BalanceResponse, FavaControlResponse, FavaStatus, ImageParseRequest,
  LoginRequest, LoginResponse, ParseResponse, TextParseRequest, TransactionRequest,
  TransactionResponse,
};
use super::ApiClient;
use crate::error::{ApiError, Result};

impl ApiClient {
  /// Exchange username and password for a bearer token and store it.
  ///
  /// Nothing is stored unless the exchange succeeds.
  pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
    let body = LoginRequest { username, password };
    let response: LoginResponse = self.post_json("login", Some(&body)).await?;

    self
      .session()
      .establish(&response.access_token)
      .map_err(|e| ApiError::TokenStore(e.to_string()))?;
    info!(username, "logged in");

    Ok(response)
  }

  /// Drop the credential and return to the login boundary.
  pub fn logout(&self) {
    info!("logging out");
    self.session().teardown();
  }

  /// Recognise a transaction from a base64-encoded receipt image
  pub async fn parse_image(&self, image_base64: &str) -> Result<ParseResponse> {
    let body = ImageParseRequest {
      image: image_base64,
    };
    self.post_json("parse/image", Some(&body)).await
  }

  /// Recognise a transaction from free text
  pub async fn parse_text(&self, text: &str) -> Result<ParseResponse> {
    self.post_json("parse/text", Some(&TextParseRequest { text })).await
  }

  /// Append a transaction to the ledger
  pub async fn save_transaction(
    &self,
    transaction: &TransactionRequest,
  ) -> Result<TransactionResponse> {
    self.post_json("transaction", Some(transaction)).await
  }

  pub async fn balance(&self) -> Result<BalanceResponse> {
    self.get_json("balance").await
  }

  pub async fn accounts(&self) -> Result<AccountsResponse> {
    self.get_json("accounts").await
  }

  /// Payment methods, bank cards and categories the ledger accepts
  pub async fn account_config(&self) -> Result<Value> {
    self.get_json("config/accounts").await
  }

  pub async fn start_fava(&self) -> Result<FavaControlResponse> {
    self.post_json::<Value, _>("fava/start", None).await
  }

  pub async fn stop_fava(&self) -> Result<FavaControlResponse> {
    self.post_json::<Value, _>("fava/stop", None).await
  }

  pub async fn fava_status(&self) -> Result<FavaStatus> {
    self.get_json("fava/status").await
  }
}
