use athenaql_athena::AthenaClient;

use crate::schema::{build_schema, AthenaSchema};

pub struct AppState {
    pub schema: AthenaSchema,
    /// Whether a default result location is configured; reported by `/health`.
    pub athena_configured: bool,
}

impl AppState {
    pub fn new(client: AthenaClient) -> Self {
        let athena_configured = client.config().is_configured();
        Self {
            schema: build_schema(client),
            athena_configured,
        }
    }
}
