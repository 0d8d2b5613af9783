//! Walks through a container's life with logging switched on
//!
//! JSON output:
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Pretty output:
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use std::sync::Arc;
use tiny_ioc::{Component, Container, Key, Result, create_key, inject};

struct Database {
    url: String,
}

struct UserRepo {
    db: Arc<Database>,
}

impl Component for UserRepo {
    type Deps = (Arc<Database>,);
    fn construct((db,): Self::Deps) -> Result<Self> {
        Ok(UserRepo { db })
    }
}

struct RequestHandler {
    repo: Arc<UserRepo>,
    request_id: Arc<String>,
}

impl Component for RequestHandler {
    type Deps = ();
    fn construct(_: ()) -> Result<Self> {
        Ok(RequestHandler {
            repo: inject(&Key::of())?,
            request_id: inject(&REQUEST_ID.with(Clone::clone))?,
        })
    }
}

thread_local! {
    static REQUEST_ID: Key<String> = create_key("request-id");
}

fn main() {
    tiny_ioc::logging::builder().trace().container_only().init();

    println!("=== tiny-ioc logging demo ===\n");

    // "Creating new root container"
    let container = Container::new();

    // "Registered builder"
    container.add_instance(&Key::<Database>::of(), Database {
        url: "postgres://localhost/app".into(),
    });
    container
        .add_class::<UserRepo>()
        .args((Key::of(),))
        .singleton();
    container.add_class::<RequestHandler>().scoped();

    // "No registration in container or parent chain"
    let missing = create_key::<u32>("missing");
    assert!(container.safe_get(&missing).unwrap().is_none());

    let request_id = REQUEST_ID.with(Clone::clone);
    for id in ["req-1", "req-2"] {
        // "Creating child scope"
        let scope = container.create_scope();
        scope.add_instance(&request_id, id.to_string());

        // "Compiled pending builders", "Cache miss", "Invoking factory", ambient stack push/pop
        let handler = scope.get(&Key::<RequestHandler>::of()).unwrap();
        // "Cache hit"
        let again = scope.get(&Key::<RequestHandler>::of()).unwrap();
        assert!(Arc::ptr_eq(&handler, &again));

        println!(
            "  handled {} with repo on {}",
            handler.request_id, handler.repo.db.url
        );
    }

    println!("\n=== Demo complete ===");
}
