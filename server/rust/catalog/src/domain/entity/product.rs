use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product はカタログに登録された商品を表す。
/// sku は大文字小文字を区別せずに一意である。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// apply_import は CSV 行の内容で名前と説明を上書きし、商品を有効化する。
    /// 無効化されていた商品もインポートで再有効化される。
    pub fn apply_import(&mut self, name: String, description: Option<String>) {
        self.name = name;
        self.description = description;
        self.active = true;
        self.updated_at = Utc::now();
    }

    /// sku_key は一意性判定に使う正規化済みキーを返す。
    pub fn sku_key(&self) -> String {
        normalize_sku(&self.sku)
    }

    /// public_fields は Webhook 通知に載せる公開フィールドを返す。
    pub fn public_fields(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "sku": self.sku,
            "name": self.name,
            "description": self.description,
            "active": self.active,
        })
    }
}

/// normalize_sku は大文字小文字を無視した比較用の sku キーを返す。
pub fn normalize_sku(sku: &str) -> String {
    sku.to_lowercase()
}

/// clean_description は前後の空白を除去し、空文字列を None として扱う。
pub fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// NewProduct は ID 採番前の商品。
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

impl NewProduct {
    pub fn new(sku: String, name: String, description: Option<String>, active: bool) -> Self {
        Self {
            sku,
            name,
            description,
            active,
        }
    }
}

/// ProductFilter は一覧取得の絞り込み条件。
/// 文字列条件は大文字小文字を無視した部分一致、active は完全一致で評価する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        fn contains(haystack: &str, needle: &str) -> bool {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }

        if let Some(ref sku) = self.sku {
            if !contains(&product.sku, sku) {
                return false;
            }
        }
        if let Some(ref name) = self.name {
            if !contains(&product.name, name) {
                return false;
            }
        }
        if let Some(ref description) = self.description {
            match product.description {
                Some(ref d) if contains(d, description) => {}
                _ => return false,
            }
        }
        if let Some(active) = self.active {
            if product.active != active {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(sku: &str, description: Option<&str>, active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            sku: sku.to_string(),
            name: "Widget".to_string(),
            description: description.map(str::to_string),
            active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn apply_import_reactivates() {
        let mut p = product("ABC-1", Some("old"), false);
        p.apply_import("New name".to_string(), None);
        assert_eq!(p.name, "New name");
        assert_eq!(p.description, None);
        assert!(p.active);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let p = product("ABC-1", Some("Blue Widget"), true);
        let filter = ProductFilter {
            sku: Some("abc".to_string()),
            description: Some("blue".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&p));
    }

    #[test]
    fn filter_description_requires_value() {
        let p = product("ABC-1", None, true);
        let filter = ProductFilter {
            description: Some("x".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&p));
    }

    #[test]
    fn filter_active_is_exact() {
        let p = product("ABC-1", None, false);
        let filter = ProductFilter {
            active: Some(true),
            ..Default::default()
        };
        assert!(!filter.matches(&p));
        assert!(ProductFilter::default().matches(&p));
    }

    #[test]
    fn clean_description_drops_blank() {
        assert_eq!(clean_description(Some("  ".to_string())), None);
        assert_eq!(clean_description(Some(" a ".to_string())), Some("a".to_string()));
        assert_eq!(clean_description(None), None);
    }

    #[test]
    fn public_fields_shape() {
        let p = product("ABC-1", None, true);
        let v = p.public_fields();
        assert_eq!(v["sku"], "ABC-1");
        assert!(v["description"].is_null());
        assert!(v.get("created_at").is_none());
    }
}
