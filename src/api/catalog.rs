//! Catalog API
//!
//! Home page aggregate, banners, categories and products. These are plain
//! reads; pricing and category semantics belong to the server.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::article::Article;
use crate::api::common::{Paginated, SortOrder, Tag};
use crate::api::r#trait::{ApiContext, MiniappApi};
use crate::client::RequestOptions;
use crate::error::MiniappError;

const BASE_PATH: &str = "/miniapp";

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Banner {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: String,
    /// `product`, `page` or `webview`
    #[serde(default)]
    pub link_type: String,
    /// Product id or page path, depending on `link_type`
    #[serde(default)]
    pub link_value: serde_json::Value,
    #[serde(default)]
    pub description: Option<String>,
}

/// Category node; `children` nests the tree.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Category {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "imageUrl")]
    pub image: String,
    #[serde(default)]
    pub product_count: Option<u32>,
    #[serde(default)]
    pub children: Vec<Category>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default, alias = "main_image")]
    pub image: String,
    #[serde(default)]
    pub sales: Option<u32>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub is_new: Option<bool>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductDetail {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub sales: u32,
    #[serde(default)]
    pub main_image: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub detail_html: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub brand: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeaturedProducts {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Everything the home page renders, in one call.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HomeData {
    #[serde(default)]
    pub banners: Vec<Banner>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub featured: FeaturedProducts,
    #[serde(default)]
    pub hot_products: Vec<Product>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub new_products: Vec<Product>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryProducts {
    #[serde(default)]
    pub category_name: String,
    #[serde(default, rename = "data")]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    CreateTime,
    Price,
    Sales,
}

impl ProductSort {
    fn as_str(self) -> &'static str {
        match self {
            ProductSort::CreateTime => "create_time",
            ProductSort::Price => "price",
            ProductSort::Sales => "sales",
        }
    }
}

/// Filters for [`CatalogApi::search`]; unset fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct ProductSearch {
    pub keyword: Option<String>,
    pub category_id: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_by: Option<ProductSort>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductSearch {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    fn apply(&self, options: RequestOptions) -> RequestOptions {
        options
            .query_opt("page", self.page)
            .query_opt("per_page", self.per_page)
            .query_opt("keyword", self.keyword.as_deref())
            .query_opt("category_id", self.category_id)
            .query_opt("min_price", self.min_price)
            .query_opt("max_price", self.max_price)
            .query_opt("sort_by", self.sort_by.map(ProductSort::as_str))
            .query_opt("sort_order", self.sort_order.map(SortOrder::as_str))
    }
}

pub struct CatalogApi {
    context: Arc<ApiContext>,
}

impl CatalogApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    pub async fn home_data(&self) -> Result<HomeData, MiniappError> {
        self.context
            .fetch(RequestOptions::get(format!("{BASE_PATH}/home/data")))
            .await
    }

    pub async fn banners(&self) -> Result<Vec<Banner>, MiniappError> {
        self.context
            .fetch(RequestOptions::get(format!("{BASE_PATH}/banners")))
            .await
    }

    pub async fn hot_products(&self, page: u32, limit: u32) -> Result<Paginated<Product>, MiniappError> {
        let options = RequestOptions::get(format!("{BASE_PATH}/hot-products"))
            .query("page", page)
            .query("limit", limit);
        self.context.fetch(options).await
    }

    /// Category tree.
    pub async fn categories(&self) -> Result<Vec<Category>, MiniappError> {
        self.context
            .fetch(RequestOptions::get(format!("{BASE_PATH}/category/list")))
            .await
    }

    pub async fn category_products(
        &self,
        category_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<CategoryProducts, MiniappError> {
        let options = RequestOptions::get(format!("{BASE_PATH}/category/{category_id}/products"))
            .query("page", page)
            .query("limit", limit);
        self.context.fetch(options).await
    }

    pub async fn product_detail(&self, product_id: i64) -> Result<ProductDetail, MiniappError> {
        self.context
            .fetch(RequestOptions::get(format!("{BASE_PATH}/product/{product_id}")))
            .await
    }

    pub async fn search(&self, search: &ProductSearch) -> Result<SearchResult, MiniappError> {
        let options = search.apply(RequestOptions::get(format!("{BASE_PATH}/product/search")));
        self.context.fetch(options).await
    }
}

impl MiniappApi for CatalogApi {
    fn context(&self) -> &ApiContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "catalog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tree_parse() {
        let json = r#"[{
            "id": 1,
            "name": "Tea",
            "imageUrl": "/img/tea.png",
            "children": [{"id": 2, "name": "Green", "imageUrl": "", "children": []}]
        }]"#;
        let tree: Vec<Category> = serde_json::from_str(json).unwrap();
        assert_eq!(tree[0].image, "/img/tea.png");
        assert_eq!(tree[0].children[0].name, "Green");
        assert!(tree[0].children[0].children.is_empty());
    }

    #[test]
    fn test_home_data_tolerates_missing_sections() {
        let home: HomeData = serde_json::from_str(
            r#"{"banners": [{"id": 1, "title": "Sale", "image": "/b.png", "link_type": "product", "link_value": 9}]}"#,
        )
        .unwrap();
        assert_eq!(home.banners.len(), 1);
        assert_eq!(home.banners[0].link_value, serde_json::json!(9));
        assert!(home.hot_products.is_empty());
        assert!(home.featured.products.is_empty());
    }

    #[test]
    fn test_search_query_skips_unset_filters() {
        let search = ProductSearch {
            category_id: Some(3),
            sort_by: Some(ProductSort::Price),
            sort_order: Some(SortOrder::Asc),
            page: Some(2),
            ..ProductSearch::keyword("oolong")
        };
        let options = search.apply(RequestOptions::get("/miniapp/product/search"));
        let keys: Vec<&str> = options
            .query_params()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["page", "keyword", "category_id", "sort_by", "sort_order"]);
        assert_eq!(options.query_params()[3].1, "price");
    }

    #[test]
    fn test_category_products_parse() {
        let json = r#"{
            "category_name": "Tea",
            "data": [{"id": 5, "name": "Oolong", "price": 12.5, "main_image": "/o.png"}],
            "total": 1, "pages": 1, "page": 1, "per_page": 10
        }"#;
        let page: CategoryProducts = serde_json::from_str(json).unwrap();
        assert_eq!(page.products[0].image, "/o.png");
        assert_eq!(page.per_page, 10);
    }
}
