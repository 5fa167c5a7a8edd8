//! Structured filter predicates for vector search

use super::CandidateMetadata;
use crate::error::{Result, TizzlError};
use crate::models::{Category, StyleRequest};
use serde::{Deserialize, Serialize};

/// Conjunction of optional constraints; `None` means unconstrained
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Item category must be one of these
    pub categories: Option<Vec<Category>>,
    /// Display price must not exceed this
    pub max_price: Option<f64>,
    /// Required stock flag
    pub in_stock: Option<bool>,
}

impl FilterPredicate {
    /// Predicate that admits everything
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn in_stock_only() -> Self {
        Self {
            in_stock: Some(true),
            ..Self::default()
        }
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.categories.is_none() && self.max_price.is_none() && self.in_stock.is_none()
    }

    /// Check the predicate is expressible by an index
    pub fn validate(&self) -> Result<()> {
        if let Some(ref categories) = self.categories {
            if categories.is_empty() {
                return Err(TizzlError::MalformedPredicate(
                    "empty category set".to_string(),
                ));
            }
        }
        if let Some(max_price) = self.max_price {
            if !max_price.is_finite() || max_price < 0.0 {
                return Err(TizzlError::MalformedPredicate(format!(
                    "invalid price ceiling {}",
                    max_price
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, metadata: &CandidateMetadata) -> bool {
        if let Some(ref categories) = self.categories {
            if !categories.contains(&metadata.category) {
                return false;
            }
        }
        if let Some(max_price) = self.max_price {
            if metadata.display_price() > max_price {
                return false;
            }
        }
        if let Some(in_stock) = self.in_stock {
            if metadata.in_stock != in_stock {
                return false;
            }
        }
        true
    }
}

/// Derives the vector search predicate from a request.
///
/// Excluded categories are left to the business rule filter since a
/// "not in" constraint is not part of the predicate language.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterBuilder;

impl FilterBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, request: &StyleRequest) -> Result<FilterPredicate> {
        let mut predicate = FilterPredicate::in_stock_only();

        if let Some(budget) = request.budget {
            if !budget.is_finite() || budget < 0.0 {
                return Err(TizzlError::InvalidRequest(format!(
                    "budget must not be negative, got {}",
                    budget
                )));
            }
            if budget > 0.0 {
                predicate.max_price = Some(budget);
            }
        }

        if !request.preferred_categories.is_empty() {
            predicate.categories = Some(request.preferred_categories.clone());
        }

        tracing::debug!("Built predicate: {:?}", predicate);
        Ok(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_request_only_constrains_stock() {
        let predicate = FilterBuilder.build(&StyleRequest::new("tee")).unwrap();
        assert_eq!(predicate, FilterPredicate::in_stock_only());
    }

    #[test]
    fn test_budget_and_categories() {
        let request = StyleRequest::new("going out top")
            .with_budget(100.0)
            .prefer_category(Category::Tops)
            .exclude_category(Category::Shoes);
        let predicate = FilterBuilder.build(&request).unwrap();

        assert_eq!(predicate.max_price, Some(100.0));
        assert_eq!(predicate.categories, Some(vec![Category::Tops]));
        assert_eq!(predicate.in_stock, Some(true));
    }

    #[test]
    fn test_negative_budget_rejected() {
        let request = StyleRequest::new("tee").with_budget(-1.0);
        assert!(matches!(
            FilterBuilder.build(&request),
            Err(TizzlError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_matches_uses_display_price() {
        let predicate = FilterPredicate {
            max_price: Some(100.0),
            ..Default::default()
        };
        let mut meta = CandidateMetadata::new("Coat", Category::Outerwear, 140.0);
        assert!(!predicate.matches(&meta));
        meta.sale_price = Some(90.0);
        assert!(predicate.matches(&meta));
    }

    #[test]
    fn test_validate() {
        assert!(FilterPredicate::unconstrained().validate().is_ok());
        assert!(FilterPredicate::unconstrained()
            .with_categories(vec![])
            .validate()
            .is_err());
    }

    proptest! {
        #[test]
        fn prop_unconstrained_admits_everything(price in 0.0f64..10_000.0, in_stock: bool) {
            let mut meta = CandidateMetadata::new("x", Category::Bags, price);
            meta.in_stock = in_stock;
            prop_assert!(FilterPredicate::unconstrained().matches(&meta));
        }

        #[test]
        fn prop_build_is_pure(budget in 0.01f64..1_000.0, n in 0usize..4) {
            let mut request = StyleRequest::new("q").with_budget(budget);
            for category in Category::ALL.iter().take(n) {
                request = request.prefer_category(*category);
            }
            let a = FilterBuilder.build(&request).unwrap();
            let b = FilterBuilder.build(&request).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.max_price, Some(budget));
            prop_assert_eq!(a.categories.is_some(), n > 0);
        }
    }
}
