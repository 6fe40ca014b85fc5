use crate::client::ServiceContext;
use crate::decode;
use crate::models::AccountInfo;
use crate::params::ParameterSet;
use crate::response::Response;

pub const GET_ACCOUNT_INFO: &str = "rustici.reporting.getAccountInfo";

pub struct AccountService {
    context: ServiceContext,
}

impl AccountService {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Account attributes and registration usage.
    pub async fn account_info(&self) -> Response<AccountInfo> {
        let parameters = ParameterSet::new().with("method", GET_ACCOUNT_INFO);
        self.context.call(&parameters, decode::account_info).await
    }
}
