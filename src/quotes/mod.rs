//! Swap quote selection
//!
//! The book holds one generation of externally supplied quotes and at most
//! one selection. Every refresh starts a new generation, so a handle taken
//! from an earlier list can no longer be selected even if an identical
//! quote reappears. Confirming turns the selection into a swap
//! `SigningRequest` carrying the quote's amounts and path verbatim.

mod types;

pub use types::{Quote, QuoteHandle, QuoteId, QuoteQuery, Slippage, MAX_SLIPPAGE_PERCENT};

use crate::pipeline::{IntentKind, IntentParams, SigningRequest};
use crate::services::QuoteSource;
use crate::{Error, Result};
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Default)]
pub struct QuoteBook {
    generation: u64,
    quotes: Vec<Quote>,
    ids: Vec<QuoteId>,
    selected: Option<usize>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list; clears the selection and invalidates all handles
    pub fn refresh(&mut self, quotes: Vec<Quote>) {
        self.generation += 1;
        self.ids = quotes.iter().map(Quote::id).collect();
        self.quotes = quotes;
        self.selected = None;
        debug!(
            generation = self.generation,
            count = self.quotes.len(),
            "Quote list refreshed"
        );
    }

    /// Query `source` and replace the list with its answer
    pub async fn refresh_from<Q: QuoteSource + ?Sized>(
        &mut self,
        source: &Q,
        query: &QuoteQuery,
    ) -> Result<&[Quote]> {
        let quotes = source.quotes(query).await?;
        self.refresh(quotes);
        Ok(&self.quotes)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Handles for the current generation, in list order
    pub fn handles(&self) -> Vec<QuoteHandle> {
        self.ids
            .iter()
            .enumerate()
            .map(|(index, id)| QuoteHandle {
                generation: self.generation,
                index,
                id: *id,
            })
            .collect()
    }

    /// Handle of the first quote from `source`
    pub fn handle_for_source(&self, source: &str) -> Option<QuoteHandle> {
        self.quotes
            .iter()
            .position(|q| q.source == source)
            .map(|index| QuoteHandle {
                generation: self.generation,
                index,
                id: self.ids[index],
            })
    }

    /// Select a quote of the current generation
    ///
    /// # Errors
    /// `Error::StaleQuote` if the list was refreshed since the handle was taken.
    pub fn select(&mut self, handle: QuoteHandle) -> Result<&Quote> {
        if handle.generation != self.generation
            || self.ids.get(handle.index) != Some(&handle.id)
        {
            return Err(Error::StaleQuote);
        }
        self.selected = Some(handle.index);
        Ok(&self.quotes[handle.index])
    }

    pub fn selected(&self) -> Option<&Quote> {
        self.selected.map(|i| &self.quotes[i])
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Swap request for the selected quote
    ///
    /// Slippage travels as a request parameter for the builder to apply.
    pub fn confirm(&self, slippage: Slippage, pin: SecretString) -> Result<SigningRequest> {
        let index = self.selected.ok_or(Error::NoQuoteSelected)?;
        let quote = &self.quotes[index];

        let params = json!({
            "quote_id": self.ids[index].to_string(),
            "source": quote.source,
            "source_asset": quote.source_asset,
            "dest_asset": quote.dest_asset,
            "source_amount": quote.source_amount,
            "dest_amount": quote.dest_amount,
            "path": quote.path,
            "slippage_percent": slippage.as_percent(),
        });
        let params: IntentParams = match params {
            Value::Object(map) => map,
            _ => IntentParams::new(),
        };
        Ok(SigningRequest::new(IntentKind::Swap, params, pin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRef;
    use crate::wallet::Keypair;
    use async_trait::async_trait;

    fn pin() -> SecretString {
        SecretString::from("1234".to_string())
    }

    fn usdc() -> AssetRef {
        AssetRef::credit("USDC", Keypair::generate().unwrap().public_key()).unwrap()
    }

    fn quote(source: &str, dest_amount: &str, path: Vec<AssetRef>) -> Quote {
        Quote {
            source: source.to_string(),
            source_asset: AssetRef::Native,
            dest_asset: path.last().cloned().unwrap_or(AssetRef::Native),
            source_amount: "50".to_string(),
            dest_amount: dest_amount.to_string(),
            path,
            price_impact: Some(0.1),
            fee: None,
            rate: 2.0,
        }
    }

    #[test]
    fn test_confirm_carries_selected_quote_verbatim() {
        let hop = usdc();
        let mut book = QuoteBook::new();
        book.refresh(vec![
            quote("PathA", "100", vec![hop.clone()]),
            quote("PathB", "98", vec![]),
        ]);

        let handle = book.handle_for_source("PathA").unwrap();
        book.select(handle).unwrap();
        let request = book.confirm(Slippage::percent(1.0).unwrap(), pin()).unwrap();

        assert_eq!(request.kind, IntentKind::Swap);
        assert_eq!(request.params["source"], "PathA");
        assert_eq!(request.params["source_amount"], "50");
        assert_eq!(request.params["dest_amount"], "100");
        assert_eq!(request.params["path"], json!([hop.to_string()]));
        assert_eq!(request.param_f64("slippage_percent"), Some(1.0));
        assert!(!request.params.contains_key("pin"));
    }

    #[test]
    fn test_selecting_after_refresh_is_stale() {
        let mut book = QuoteBook::new();
        book.refresh(vec![quote("PathA", "100", vec![])]);
        let old = book.handles()[0];

        // Same content, new generation
        book.refresh(vec![quote("PathA", "100", vec![])]);
        assert!(matches!(book.select(old), Err(Error::StaleQuote)));
        assert!(book.selected().is_none());

        let fresh = book.handles()[0];
        assert_eq!(fresh.id(), old.id());
        assert!(book.select(fresh).is_ok());
    }

    #[test]
    fn test_refresh_clears_selection() {
        let mut book = QuoteBook::new();
        book.refresh(vec![quote("PathA", "100", vec![])]);
        book.select(book.handles()[0]).unwrap();
        assert!(book.selected().is_some());

        book.refresh(vec![quote("PathB", "98", vec![])]);
        assert!(book.selected().is_none());
        assert!(matches!(
            book.confirm(Slippage::default(), pin()),
            Err(Error::NoQuoteSelected)
        ));
    }

    #[test]
    fn test_handle_from_other_list_position_is_stale() {
        let mut book = QuoteBook::new();
        book.refresh(vec![quote("PathA", "100", vec![]), quote("PathB", "98", vec![])]);
        let mut handle = book.handles()[0];
        handle.index = 1;
        assert!(matches!(book.select(handle), Err(Error::StaleQuote)));
    }

    struct FixedSource(Vec<Quote>);

    #[async_trait]
    impl QuoteSource for FixedSource {
        async fn quotes(&self, _query: &QuoteQuery) -> Result<Vec<Quote>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_refresh_from_source() {
        let source = FixedSource(vec![quote("PathA", "100", vec![]), quote("PathB", "98", vec![])]);
        let query = QuoteQuery::new(AssetRef::Native, "50", usdc()).unwrap();

        let mut book = QuoteBook::new();
        let quotes = book.refresh_from(&source, &query).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(book.generation(), 1);
        assert_eq!(book.handles()[1].index(), 1);
    }
}
