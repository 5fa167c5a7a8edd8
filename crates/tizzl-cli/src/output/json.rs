//! JSON output formatter

use tizzl_core::{OutfitPair, Product, RankedProduct, RetrievalOutput};

fn product_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "product_id": product.product_id,
        "name": product.name,
        "category": product.category,
        "price": product.price,
        "display_price": product.display_price(),
        "currency": product.currency,
        "on_sale": product.is_on_sale(),
        "in_stock": product.in_stock,
    })
}

fn ranked_json(ranked: &RankedProduct) -> serde_json::Value {
    let mut value = product_json(&ranked.product);
    value["rank"] = serde_json::json!(ranked.rank);
    value["distance"] = serde_json::json!(ranked.distance);
    value
}

pub fn format_search_output(output: &RetrievalOutput) -> String {
    let diag = &output.diagnostics;
    let value = serde_json::json!({
        "products": output.products.iter().map(ranked_json).collect::<Vec<_>>(),
        "diagnostics": {
            "search_text": diag.search_text,
            "keywords": diag.keywords,
            "retrieved": diag.counts.retrieved,
            "returned": diag.counts.returned,
            "index_size": diag.index_size,
            "empty_catalog": diag.empty_catalog,
            "reranked": diag.reranked,
            "degraded": diag.degraded.stages(),
            "state": diag.final_state,
            "elapsed_ms": diag.elapsed_ms,
        },
    });

    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_products(products: &[RankedProduct]) -> String {
    let output: Vec<serde_json::Value> = products.iter().map(ranked_json).collect();
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "[]".to_string()) + "\n"
}

pub fn format_outfits(outfits: &[OutfitPair]) -> String {
    let output: Vec<serde_json::Value> = outfits
        .iter()
        .map(|pair| {
            serde_json::json!({
                "anchor": pair.anchor.product_id,
                "category": pair.category,
                "item": product_json(&pair.item),
            })
        })
        .collect();

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "[]".to_string()) + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tizzl_core::Category;

    #[test]
    fn test_products_json_shape() {
        let mut product = Product::new("sku-1", "Linen Shirt", Category::Tops, 50.0);
        product.sale_price = Some(40.0);
        let ranked = RankedProduct {
            rank: 1,
            product,
            distance: 0.25,
        };

        let out = format_products(&[ranked]);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["product_id"], "sku-1");
        assert_eq!(parsed[0]["category"], "tops");
        assert_eq!(parsed[0]["display_price"], 40.0);
        assert_eq!(parsed[0]["on_sale"], true);
        assert_eq!(parsed[0]["rank"], 1);
    }

    #[test]
    fn test_empty_outfits() {
        assert_eq!(format_outfits(&[]), "[]\n");
    }
}
