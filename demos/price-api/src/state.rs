/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// The SDK instance. Its data service deduplicates concurrent upstream
    /// fetches, so handlers call it directly.
    pub sdk: pokeprice_sdk::PokePriceSdk,
}
