use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use unified_cfg::{AddressLookup, LookupError, RenderError, Resolver, Store};

struct CountingLookup {
    calls: Arc<AtomicUsize>,
}

impl AddressLookup for CountingLookup {
    fn lookup(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match hostname {
            "db.internal" => Ok(vec![Ipv4Addr::new(127, 0, 1, 1), Ipv4Addr::new(10, 0, 0, 7)]),
            _ => Ok(Vec::new()),
        }
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Defaults directory plus a site override file.
fn layered() -> (TempDir, Store, Arc<AtomicUsize>) {
    let dir = TempDir::new().unwrap();
    let defaults = dir.path().join("defaults");
    write(
        &defaults.join("svc.ini"),
        "[http]\nport = 80\nhost = db.internal\n\n[features]\ncache = yes\n",
    );
    write(&defaults.join("db").join("main.toml"), "host = \"db.internal\"\npool = 4\n");
    let site = dir.path().join("site.toml");
    write(&site, "[svc.http]\nport = 8080\n\n[db.main]\npool = \"many\"\n");

    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = Arc::new(Resolver::new(CountingLookup {
        calls: Arc::clone(&calls),
    }));
    let store = Store::builder()
        .with_source(&defaults)
        .with_source(&site)
        .with_resolver(resolver)
        .build()
        .unwrap();

    (dir, store, calls)
}

#[test]
fn test_layered_sources_merge() {
    let (_dir, store, _) = layered();

    assert_eq!(store.as_int("svc.http.port").unwrap(), 8080);
    assert!(store.as_bool("svc.features.cache").unwrap());
    assert_eq!(store.get_str("db.main.host").unwrap(), "db.internal");

    let settings = store.settings();
    let keys: Vec<_> = settings.get_group("svc.http").unwrap().keys().collect();
    assert_eq!(keys, vec!["port", "host"]);
}

#[test]
fn test_typed_access_errors() {
    let (_dir, store, _) = layered();
    let settings = store.settings();
    let cast = settings.cast();

    assert!(matches!(cast.int("db.main.pool"), Err(LookupError::Conversion { .. })));
    assert!(matches!(cast.int_or("db.main.pool", 1), Err(LookupError::Conversion { .. })));
    assert_eq!(cast.int_or("db.main.timeout", 0).unwrap(), 0);
    assert_eq!(cast.int("svc.http"), Err(LookupError::NotFound("svc.http".into())));
}

#[test]
fn test_render_with_ip_resolution_is_cached() {
    let (_dir, store, calls) = layered();

    let template = "upstream ${svc.http.host | ip}:${svc.http.port};\n# $$HOME\n";
    let first = store.render(template).unwrap();
    let second = store.render(template).unwrap();

    assert_eq!(first, "upstream 10.0.0.7:8080;\n# $HOME\n");
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_render_is_all_or_nothing() {
    let (_dir, store, _) = layered();

    let err = store
        .render("port=${svc.http.port}\nmissing=${svc.http.missing}\n")
        .unwrap_err();
    assert!(matches!(err, RenderError::Lookup { .. }));
    assert_eq!(err.position(), Some(30));
}

#[test]
fn test_resolver_cache_survives_reload() {
    let (dir, store, calls) = layered();

    assert_eq!(store.as_ip("db.main.host").unwrap(), "10.0.0.7");
    store.set_sources([dir.path().join("site.toml")]).unwrap();
    store.set_sources([dir.path().join("defaults")]).unwrap();
    assert_eq!(store.as_ip("db.main.host").unwrap(), "10.0.0.7");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
