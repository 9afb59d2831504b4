use crate::classifier::TransientClassifier;
use crate::config::RetryStrategy;
use crate::error::ConfigError;
use crate::policy::RetryPolicy;
use log::debug;
use std::collections::HashMap;

/// A keyed store of named retry strategies with a default strategy and
/// per-category defaults (e.g. one strategy for "sql", another for "http").
///
/// The manager is an ordinary value: build one from configuration and pass it to
/// whoever needs to select a policy by name.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use transient_retry::{CatchAll, RetryManager, RetryStrategy};
///
/// let manager = RetryManager::new(
///     vec![
///         RetryStrategy::fixed(3, Duration::from_millis(100)).with_name("fixed"),
///         RetryStrategy::default_exponential().with_name("backoff"),
///     ],
///     Some("fixed"),
///     HashMap::from([("http".to_string(), "backoff".to_string())]),
/// )
/// .unwrap();
///
/// assert_eq!(manager.default_strategy().unwrap().name(), "fixed");
/// assert_eq!(
///     manager.default_strategy_for("http").unwrap().map(RetryStrategy::name),
///     Some("backoff")
/// );
/// let policy = manager.policy::<std::io::Error, _>(CatchAll).unwrap();
/// assert_eq!(policy.strategy().attempt_limit(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryManager {
    strategies: HashMap<String, RetryStrategy>,
    default_name: Option<String>,
    category_defaults: HashMap<String, String>,
}

impl RetryManager {
    /// Indexes `strategies` by name.
    ///
    /// # Errors
    /// * [`ConfigError::DuplicateStrategy`] if two strategies share a name.
    /// * [`ConfigError::UnknownStrategy`] if `default_name` or a category default
    ///   names a strategy that is not registered.
    ///
    /// Blank `default_name` and blank category values are treated as unset.
    pub fn new<I>(
        strategies: I,
        default_name: Option<&str>,
        category_defaults: HashMap<String, String>,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = RetryStrategy>,
    {
        let mut indexed = HashMap::new();
        for strategy in strategies {
            let name = strategy.name().to_string();
            if indexed.insert(name.clone(), strategy).is_some() {
                return Err(ConfigError::DuplicateStrategy(name));
            }
        }

        let mut manager = RetryManager {
            strategies: indexed,
            default_name: None,
            category_defaults: HashMap::new(),
        };

        for (category, name) in category_defaults {
            if is_blank(&name) {
                continue;
            }
            if !manager.strategies.contains_key(&name) {
                return Err(ConfigError::UnknownStrategy(name));
            }
            manager.category_defaults.insert(category, name);
        }

        manager.set_default_strategy_name(default_name)?;
        debug!(
            "Retry manager built with {} strategies, default {:?}",
            manager.strategies.len(),
            manager.default_name
        );
        Ok(manager)
    }

    pub fn default_strategy_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Changes the default strategy. `None` or a blank name clears it.
    ///
    /// # Errors
    /// [`ConfigError::UnknownStrategy`] if `name` is not registered; the previous
    /// default is kept.
    pub fn set_default_strategy_name(&mut self, name: Option<&str>) -> Result<(), ConfigError> {
        match name.filter(|name| !is_blank(name)) {
            Some(name) if !self.strategies.contains_key(name) => {
                Err(ConfigError::UnknownStrategy(name.to_string()))
            }
            Some(name) => {
                self.default_name = Some(name.to_string());
                Ok(())
            }
            None => {
                self.default_name = None;
                Ok(())
            }
        }
    }

    pub fn default_strategy(&self) -> Option<&RetryStrategy> {
        self.default_name
            .as_ref()
            .and_then(|name| self.strategies.get(name))
    }

    /// Looks up a strategy by name.
    ///
    /// # Errors
    /// [`ConfigError::BlankName`] for a blank name, [`ConfigError::UnknownStrategy`]
    /// if nothing is registered under it.
    pub fn strategy(&self, name: &str) -> Result<&RetryStrategy, ConfigError> {
        if is_blank(name) {
            return Err(ConfigError::BlankName);
        }
        self.strategies
            .get(name)
            .ok_or_else(|| ConfigError::UnknownStrategy(name.to_string()))
    }

    /// The default strategy configured for `category`, if any.
    ///
    /// # Errors
    /// [`ConfigError::BlankName`] for a blank category.
    pub fn default_strategy_for(&self, category: &str) -> Result<Option<&RetryStrategy>, ConfigError> {
        if is_blank(category) {
            return Err(ConfigError::BlankName);
        }
        Ok(self
            .category_defaults
            .get(category)
            .and_then(|name| self.strategies.get(name)))
    }

    /// Builds a policy from `classifier` and the default strategy.
    ///
    /// Returns `None` when no default strategy is set.
    pub fn policy<E, C>(&self, classifier: C) -> Option<RetryPolicy<E>>
    where
        E: 'static,
        C: TransientClassifier<E> + 'static,
    {
        self.default_strategy()
            .map(|strategy| RetryPolicy::new(classifier, strategy.clone()))
    }

    /// Builds a policy from `classifier` and the strategy registered as `name`.
    pub fn policy_named<E, C>(&self, classifier: C, name: &str) -> Result<RetryPolicy<E>, ConfigError>
    where
        E: 'static,
        C: TransientClassifier<E> + 'static,
    {
        let strategy = self.strategy(name)?;
        Ok(RetryPolicy::new(classifier, strategy.clone()))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{CatchAll, Ignore};
    use std::time::Duration;

    fn strategies() -> Vec<RetryStrategy> {
        vec![
            RetryStrategy::fixed(3, Duration::from_millis(100)).with_name("fixed"),
            RetryStrategy::default_incremental().with_name("incremental"),
            RetryStrategy::default_exponential().with_name("exponential"),
        ]
    }

    #[test]
    fn test_lookup_by_name() {
        let manager = RetryManager::new(strategies(), None, HashMap::new()).unwrap();
        assert_eq!(manager.len(), 3);
        assert_eq!(
            manager.strategy("incremental").unwrap(),
            &RetryStrategy::default_incremental().with_name("incremental")
        );
        assert_eq!(
            manager.strategy("missing"),
            Err(ConfigError::UnknownStrategy("missing".to_string()))
        );
        assert_eq!(manager.strategy("  "), Err(ConfigError::BlankName));
        assert!(manager.default_strategy().is_none());
        assert!(manager.policy::<&str, _>(CatchAll).is_none());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut list = strategies();
        list.push(RetryStrategy::no_retry().with_name("fixed"));
        let result = RetryManager::new(list, None, HashMap::new());
        assert_eq!(result.unwrap_err(), ConfigError::DuplicateStrategy("fixed".to_string()));
    }

    #[test]
    fn test_unknown_default_is_rejected() {
        let result = RetryManager::new(strategies(), Some("missing"), HashMap::new());
        assert_eq!(result.unwrap_err(), ConfigError::UnknownStrategy("missing".to_string()));
    }

    #[test]
    fn test_unknown_category_default_is_rejected() {
        let categories = HashMap::from([("sql".to_string(), "nope".to_string())]);
        let result = RetryManager::new(strategies(), None, categories);
        assert_eq!(result.unwrap_err(), ConfigError::UnknownStrategy("nope".to_string()));
    }

    #[test]
    fn test_category_defaults() {
        let categories = HashMap::from([
            ("sql".to_string(), "incremental".to_string()),
            ("blob".to_string(), " ".to_string()),
        ]);
        let manager = RetryManager::new(strategies(), Some("fixed"), categories).unwrap();

        assert_eq!(manager.default_strategy_name(), Some("fixed"));
        assert_eq!(
            manager.default_strategy_for("sql").unwrap().map(RetryStrategy::name),
            Some("incremental")
        );
        assert_eq!(manager.default_strategy_for("blob").unwrap(), None);
        assert_eq!(manager.default_strategy_for("http").unwrap(), None);
        assert_eq!(manager.default_strategy_for(""), Err(ConfigError::BlankName));
    }

    #[test]
    fn test_change_default_strategy() {
        let mut manager = RetryManager::new(strategies(), Some("fixed"), HashMap::new()).unwrap();

        manager.set_default_strategy_name(Some("exponential")).unwrap();
        assert_eq!(manager.default_strategy().unwrap().name(), "exponential");

        assert!(manager.set_default_strategy_name(Some("missing")).is_err());
        assert_eq!(manager.default_strategy_name(), Some("exponential"));

        manager.set_default_strategy_name(Some("")).unwrap();
        assert_eq!(manager.default_strategy_name(), None);
    }

    #[test]
    fn test_policies_from_registry() {
        let manager = RetryManager::new(strategies(), Some("exponential"), HashMap::new()).unwrap();

        let policy = manager.policy::<&str, _>(CatchAll).unwrap();
        assert_eq!(policy.strategy().name(), "exponential");

        let named = manager.policy_named::<&str, _>(Ignore, "fixed").unwrap();
        assert_eq!(named.strategy().attempt_limit(), 3);
        assert!(!named.classifier().is_transient(&"boom"));

        assert!(manager.policy_named::<&str, _>(Ignore, "missing").is_err());
    }

    #[test]
    fn test_empty_manager() {
        let manager = RetryManager::default();
        assert!(manager.is_empty());
        assert!(manager.default_strategy().is_none());
    }
}
