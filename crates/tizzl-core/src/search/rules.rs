//! Hard business constraints applied after ranking

use super::{Candidate, RankedProduct};
use crate::models::{Category, Product, StyleRequest};

/// Anything the rule filter can judge
pub trait RuleSubject {
    fn category(&self) -> Category;
    fn display_price(&self) -> f64;
    fn in_stock(&self) -> bool;
    fn on_sale(&self) -> bool;
    fn colors(&self) -> &[String];
    fn sizes(&self) -> &[String];
}

impl RuleSubject for Product {
    fn category(&self) -> Category {
        self.category
    }

    fn display_price(&self) -> f64 {
        Product::display_price(self)
    }

    fn in_stock(&self) -> bool {
        self.in_stock
    }

    fn on_sale(&self) -> bool {
        self.is_on_sale()
    }

    fn colors(&self) -> &[String] {
        &self.attributes.colors
    }

    fn sizes(&self) -> &[String] {
        &self.sizes
    }
}

impl RuleSubject for Candidate {
    fn category(&self) -> Category {
        self.metadata.category
    }

    fn display_price(&self) -> f64 {
        self.metadata.display_price()
    }

    fn in_stock(&self) -> bool {
        self.metadata.in_stock
    }

    fn on_sale(&self) -> bool {
        self.metadata
            .sale_price
            .is_some_and(|sale| sale < self.metadata.price)
    }

    fn colors(&self) -> &[String] {
        &self.metadata.colors
    }

    fn sizes(&self) -> &[String] {
        &self.metadata.sizes
    }
}

impl RuleSubject for RankedProduct {
    fn category(&self) -> Category {
        self.product.category
    }

    fn display_price(&self) -> f64 {
        self.product.display_price()
    }

    fn in_stock(&self) -> bool {
        self.product.in_stock
    }

    fn on_sale(&self) -> bool {
        self.product.is_on_sale()
    }

    fn colors(&self) -> &[String] {
        &self.product.attributes.colors
    }

    fn sizes(&self) -> &[String] {
        &self.product.sizes
    }
}

/// Order-preserving filter for request constraints.
///
/// Stock and budget are re-checked here because the index snapshot
/// may be stale relative to the catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessRuleFilter;

impl BusinessRuleFilter {
    pub fn new() -> Self {
        Self
    }

    /// Whether a single item satisfies every rule of the request
    pub fn admits<T: RuleSubject>(&self, item: &T, request: &StyleRequest) -> bool {
        if !item.in_stock() {
            return false;
        }

        if request.excluded_categories.contains(&item.category()) {
            return false;
        }

        if let Some(budget) = request.budget {
            if budget > 0.0 && item.display_price() > budget {
                return false;
            }
        }

        if !request.include_sale_items && item.on_sale() {
            return false;
        }

        if !request.preferred_colors.is_empty() {
            let has_color = item.colors().iter().any(|c| {
                let c = c.to_lowercase();
                request
                    .preferred_colors
                    .iter()
                    .any(|p| p.to_lowercase() == c)
            });
            if !has_color {
                return false;
            }
        }

        if let Some(size) = request.size_constraints.get(&item.category()) {
            let sizes = item.sizes();
            if !sizes.is_empty() && !sizes.iter().any(|s| s.eq_ignore_ascii_case(size)) {
                return false;
            }
        }

        true
    }

    /// Keep admitted items in their given order, truncated to `limit`
    pub fn apply<T: RuleSubject>(
        &self,
        items: Vec<T>,
        request: &StyleRequest,
        limit: usize,
    ) -> Vec<T> {
        let before = items.len();
        let kept: Vec<T> = items
            .into_iter()
            .filter(|item| self.admits(item, request))
            .take(limit)
            .collect();

        tracing::debug!(
            "Business rules kept {} of {} items (limit {})",
            kept.len(),
            before,
            limit
        );
        kept
    }
}
