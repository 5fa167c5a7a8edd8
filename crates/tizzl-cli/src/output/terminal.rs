//! Terminal output formatter

use tizzl_core::{OutfitPair, Product, RankedProduct, RetrievalOutput};

fn price_label(product: &Product) -> String {
    if product.is_on_sale() {
        format!(
            "{:.2} {} (was {:.2})",
            product.display_price(),
            product.currency,
            product.price
        )
    } else {
        format!("{:.2} {}", product.display_price(), product.currency)
    }
}

pub fn format_products(products: &[RankedProduct]) -> String {
    let mut output = String::new();
    for ranked in products {
        let product = &ranked.product;
        output.push_str(&format!(
            "{:>3}. {} [{}] {} #{}\n",
            ranked.rank,
            product.name,
            product.category,
            price_label(product),
            product.product_id
        ));
    }
    output
}

pub fn format_search_output(output: &RetrievalOutput) -> String {
    let diag = &output.diagnostics;
    if diag.empty_catalog {
        return "No products indexed.\n".to_string();
    }
    if output.is_empty() {
        return format!("No products matched \"{}\".\n", diag.search_text);
    }

    let mut text = format_products(&output.products);
    let degraded = diag.degraded.stages();
    if !degraded.is_empty() {
        text.push_str(&format!("(degraded: {})\n", degraded.join(", ")));
    }
    text
}

pub fn format_outfits(outfits: &[OutfitPair]) -> String {
    let Some(first) = outfits.first() else {
        return "No outfit pairings found.\n".to_string();
    };

    let mut output = format!("{} #{}\n", first.anchor.name, first.anchor.product_id);
    for pair in outfits {
        output.push_str(&format!(
            "  + {:<12} {} {} #{}\n",
            pair.category.as_str(),
            pair.item.name,
            price_label(&pair.item),
            pair.item.product_id
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tizzl_core::Category;

    #[test]
    fn test_sale_price_label() {
        let mut product = Product::new("d1", "Wrap Dress", Category::Dresses, 100.0);
        assert_eq!(price_label(&product), "100.00 USD");
        product.sale_price = Some(70.0);
        assert_eq!(price_label(&product), "70.00 USD (was 100.00)");
    }

    #[test]
    fn test_products_line() {
        let ranked = RankedProduct {
            rank: 2,
            product: Product::new("s1", "Canvas Sneaker", Category::Shoes, 45.0),
            distance: 0.1,
        };
        assert_eq!(
            format_products(&[ranked]),
            "  2. Canvas Sneaker [shoes] 45.00 USD #s1\n"
        );
    }
}
