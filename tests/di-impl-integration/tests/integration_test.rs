//! 应用上下文的集中集成测试
//!
//! 覆盖配置目录加载、组件装配以及作用域组件在并发请求下的构建次数。

use di_abstractions::{ComponentOptions, InjectionContext, InjectionContextExt, Injectable};
use infrastructure_common::{ComponentScope, DependencyError, FieldInfo, PropertyBlock};
use infrastructure_composition::{ApplicationContext, ConditionalArg, ContextStatus, ScopedArg};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

mod shop {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CatalogProperties {
        pub source: String,
        pub page_size: u32,
        pub cached: bool,
    }

    impl Default for CatalogProperties {
        fn default() -> Self {
            Self {
                source: "memory".to_string(),
                page_size: 20,
                cached: false,
            }
        }
    }

    impl PropertyBlock for CatalogProperties {
        fn prefix() -> &'static str {
            "catalog"
        }
    }

    #[derive(Debug)]
    pub struct Catalog {
        pub source: String,
        pub page_size: u32,
    }

    pub fn catalog(properties: Arc<CatalogProperties>) -> Result<Catalog, DependencyError> {
        Ok(Catalog {
            source: properties.source.clone(),
            page_size: properties.page_size,
        })
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CustomerId(pub String);

    impl ConditionalArg for CustomerId {
        fn conditional_key(&self) -> String {
            self.0.clone()
        }
    }

    #[derive(Debug)]
    pub struct Cart {
        pub customer: CustomerId,
        pub catalog: Arc<Catalog>,
    }

    /// 字段注入目录组件
    #[derive(Default)]
    pub struct Storefront {
        pub catalog: Option<Arc<Catalog>>,
        pub properties: CatalogProperties,
    }

    impl Injectable for Storefront {
        fn fields() -> Vec<FieldInfo> {
            vec![FieldInfo::inject::<Catalog>("catalog")]
        }

        fn inject(&mut self, ctx: &dyn InjectionContext) -> Result<(), DependencyError> {
            self.catalog = ctx.inject("catalog")?;
            self.properties = ctx.properties();
            Ok(())
        }
    }
}

fn write_config(dir: &TempDir) {
    fs::write(
        dir.path().join("application.yml"),
        "app:\n  name: shop\n  profiles:\n    include: [cache]\ncatalog:\n  source: \"${app.name}-db\"\n  page_size: 50\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("application-cache.yml"),
        "catalog:\n  cached: \"true\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("application-staging.toml"),
        "[catalog]\npage_size = 100\n",
    )
    .unwrap();
}

fn shop_context(dir: &TempDir, calls: Arc<AtomicUsize>) -> ApplicationContext {
    let ctx = ApplicationContext::builder()
        .with_config_dir(dir.path())
        .with_profile("staging")
        .with_args(["--catalog.page_size=75"])
        .build()
        .unwrap();

    let cart = move |customer: Arc<shop::CustomerId>, catalog: Arc<shop::Catalog>| {
        calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(5));
        Ok::<_, DependencyError>(shop::Cart {
            customer: (*customer).clone(),
            catalog,
        })
    };

    ctx.register_properties::<shop::CatalogProperties>()
        .unwrap()
        .register_factory(shop::catalog)
        .unwrap()
        .register_value(shop::Storefront::default())
        .unwrap()
        .register_factory_with(
            cart,
            ComponentOptions::new().with_scope(ComponentScope::Prototype),
        )
        .unwrap();
    ctx
}

fn cart_args(customer: &str) -> Vec<ScopedArg> {
    vec![ScopedArg::new(shop::CustomerId(customer.to_string()))]
}

#[test]
fn test_context_from_config_directory() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    write_config(&dir);
    let ctx = shop_context(&dir, Arc::new(AtomicUsize::new(0)));

    let report = ctx.build()?;
    assert!(report.is_complete());
    assert_eq!(report.deferred, vec!["shop.cart"]);
    assert_eq!(report.external[0].requested, "shop.customerId");
    assert_eq!(ctx.active_profile().as_deref(), Some("staging"));

    let catalog = ctx.get_by_type::<shop::Catalog>()?;
    assert_eq!(catalog.source, "shop-db");
    assert_eq!(catalog.page_size, 75);

    let storefront = ctx.get::<shop::Storefront>("shop.storefront")?;
    assert!(Arc::ptr_eq(storefront.catalog.as_ref().unwrap(), &catalog));
    assert!(storefront.properties.cached);

    ctx.shutdown();
    assert_eq!(ctx.status(), ContextStatus::Stopped);
    assert!(matches!(
        ctx.get_by_type::<shop::Catalog>(),
        Err(DependencyError::ContainerNotInitialized)
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_prototype_requests_build_once_per_key() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = Arc::new(shop_context(&dir, Arc::clone(&calls)));
    ctx.build().unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            let customer = if i % 2 == 0 { "alice" } else { "bob" };
            tokio::task::spawn_blocking(move || {
                ctx.get_scoped_instance::<shop::Cart>("shop.cart", cart_args(customer))
            })
        })
        .collect();

    let mut carts = Vec::new();
    for handle in handles {
        carts.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let alice: Vec<_> = carts
        .iter()
        .filter(|cart| cart.customer.0 == "alice")
        .collect();
    assert_eq!(alice.len(), 8);
    assert!(alice.iter().all(|cart| Arc::ptr_eq(cart, alice[0])));

    let catalog = ctx.get_by_type::<shop::Catalog>().unwrap();
    assert!(carts.iter().all(|cart| Arc::ptr_eq(&cart.catalog, &catalog)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_singleton_requests_build_once() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let ctx = Arc::new(
        ApplicationContext::builder()
            .with_config_dir(dir.path())
            .build()
            .unwrap(),
    );
    ctx.register_factory_with(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            shop::catalog(Arc::new(shop::CatalogProperties::default()))
        },
        ComponentOptions::new().with_scope(ComponentScope::Singleton),
    )
    .unwrap();
    ctx.build().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            tokio::task::spawn_blocking(move || ctx.get_by_type::<shop::Catalog>())
        })
        .collect();

    let mut catalogs = Vec::new();
    for handle in handles {
        catalogs.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(catalogs.iter().all(|c| Arc::ptr_eq(c, &catalogs[0])));
    assert_eq!(catalogs[0].source, "memory");
}

#[test]
fn test_prototype_without_argument_fails_without_caching() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = shop_context(&dir, Arc::clone(&calls));
    ctx.build().unwrap();

    assert!(ctx
        .get_scoped_instance::<shop::Cart>("shop.cart", Vec::new())
        .is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let cart = ctx
        .get_scoped_instance::<shop::Cart>("shop.cart", cart_args("carol"))
        .unwrap();
    assert_eq!(cart.customer, shop::CustomerId("carol".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
