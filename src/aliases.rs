//! Alias cutover between index generations.

use crate::client::{AliasAction, SearchEngine};
use crate::error::{EsgenError, Result};
use crate::model::IndexDescriptor;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;

/// What a swap submitted, and which indices were left out because the engine
/// does not have them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AliasSwap {
    pub actions: Vec<AliasAction>,
    pub skipped: Vec<String>,
}

impl AliasSwap {
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

pub struct AliasSwitchboard<E: SearchEngine + 'static> {
    engine: Arc<E>,
}

impl<E: SearchEngine + 'static> AliasSwitchboard<E> {
    pub fn new(engine: Arc<E>) -> Self {
        AliasSwitchboard { engine }
    }

    /// Move the index and search aliases from `old` to `new` in a single
    /// `_aliases` request.
    ///
    /// Indices the engine does not know are skipped. Removes precede adds.
    pub async fn swap(&self, old: &[IndexDescriptor], new: &[IndexDescriptor]) -> Result<AliasSwap> {
        if old.is_empty() {
            return Err(EsgenError::MissingIndexList("no old indices given".into()));
        }
        if new.is_empty() {
            return Err(EsgenError::MissingIndexList("no new indices given".into()));
        }
        for descriptor in old.iter().chain(new) {
            if descriptor.name.is_empty() {
                return Err(EsgenError::incomplete("alias swap: index without a name"));
            }
        }

        let names: Vec<String> = old.iter().chain(new).map(|d| d.name.clone()).collect();
        let present = self.existing(&names).await?;

        let mut swap = AliasSwap::default();
        let mut adds = Vec::new();
        for (position, descriptor) in old.iter().chain(new).enumerate() {
            if !present[position] {
                tracing::info!(
                    "[aliases] index {} does not exist, skipping its aliases",
                    descriptor.name
                );
                swap.skipped.push(descriptor.name.clone());
                continue;
            }
            let removing = position < old.len();
            for alias in descriptor.aliases() {
                let index = descriptor.name.clone();
                let alias = alias.to_string();
                if removing {
                    swap.actions.push(AliasAction::Remove { index, alias });
                } else {
                    adds.push(AliasAction::Add { index, alias });
                }
            }
        }
        swap.actions.extend(adds);

        if swap.is_noop() {
            tracing::info!("[aliases] no alias actions qualify, nothing submitted");
            return Ok(swap);
        }

        self.engine.update_aliases(&swap.actions).await?;
        tracing::info!(
            "[aliases] applied {} alias actions ({} indices skipped)",
            swap.actions.len(),
            swap.skipped.len()
        );
        Ok(swap)
    }

    /// Existence of each name, in input order. The checks run concurrently.
    async fn existing(&self, names: &[String]) -> Result<Vec<bool>> {
        let mut checks = JoinSet::new();
        for (position, name) in names.iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let name = name.clone();
            checks.spawn(async move { (position, engine.index_exists(&name).await) });
        }

        let mut present = vec![false; names.len()];
        while let Some(joined) = checks.join_next().await {
            let (position, exists) = joined?;
            present[position] = exists?;
        }
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpEngine;
    use crate::config::EngineConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn descriptor(name: &str) -> IndexDescriptor {
        IndexDescriptor::new(name)
            .index_alias("blog_write")
            .search_alias("blog")
    }

    fn engine(server: &MockServer) -> Arc<HttpEngine> {
        let config = EngineConfig::default().with_url(server.uri());
        Arc::new(HttpEngine::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_swap_skips_missing_old_index() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/v0"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        for name in ["/v1", "/v2"] {
            Mock::given(method("HEAD"))
                .and(path(name))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/_aliases"))
            .and(body_json(json!({"actions": [
                {"remove": {"index": "v1", "alias": "blog_write"}},
                {"remove": {"index": "v1", "alias": "blog"}},
                {"add": {"index": "v2", "alias": "blog_write"}},
                {"add": {"index": "v2", "alias": "blog"}}
            ]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        let switchboard = AliasSwitchboard::new(engine(&server));
        let swap = switchboard
            .swap(&[descriptor("v0"), descriptor("v1")], &[descriptor("v2")])
            .await
            .unwrap();

        assert_eq!(swap.skipped, vec!["v0".to_string()]);
        assert_eq!(swap.actions.len(), 4);
    }

    #[tokio::test]
    async fn test_swap_without_qualifying_actions_makes_no_update() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_aliases"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let switchboard = AliasSwitchboard::new(engine(&server));
        let swap = switchboard
            .swap(&[descriptor("v1")], &[descriptor("v2")])
            .await
            .unwrap();
        assert!(swap.is_noop());
        assert_eq!(swap.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_lists_rejected_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let switchboard = AliasSwitchboard::new(engine(&server));
        let err = switchboard.swap(&[], &[descriptor("v2")]).await.unwrap_err();
        assert!(matches!(err, EsgenError::MissingIndexList(_)));
        let err = switchboard.swap(&[descriptor("v1")], &[]).await.unwrap_err();
        assert!(matches!(err, EsgenError::MissingIndexList(_)));
    }
}
