//! Sample host wiring a small object graph through the IoC container

use anyhow::Result;
use fluentai_ioc::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct Polite {
    prefix: Arc<String>,
}

impl Greeter for Polite {
    fn greet(&self, name: &str) -> String {
        format!("{}, {}!", self.prefix, name)
    }
}

struct Clock {
    started: std::time::Instant,
}

struct Reception {
    greeter: Arc<dyn Greeter>,
    clock: Option<Arc<Clock>>,
}

impl Autowire for Reception {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::builder("Reception::new")
                .param::<dyn Greeter>()
                .build(|args| {
                    Ok(Reception {
                        greeter: args.next()?,
                        clock: None,
                    })
                }),
            Constructor::builder("Reception::timed")
                .param::<dyn Greeter>()
                .param::<Clock>()
                .build(|args| {
                    Ok(Reception {
                        greeter: args.next()?,
                        clock: Some(args.next()?),
                    })
                }),
        ]
    }
}

/// Registered under a key that it also depends on
struct Foo {
    _inner: Arc<Foo>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== FluentAi IoC Sample Host ===\n");

    let mut builder = ContainerBuilder::new();
    builder.implements::<Polite, dyn Greeter>(|p| p)?;
    builder.register_constructor(
        ConstructionSpec::<Polite>::builder("Polite::new")
            .literal(String::from("Good morning"))
            .build(|args| Ok(Polite { prefix: args.next()? })),
    )?;
    builder.register_instance(|_: &Session| {
        Ok(Arc::new(Clock {
            started: std::time::Instant::now(),
        }))
    })?;
    builder.register_type::<Reception>()?;
    builder.for_key("foo")?.register(|session: &Session| {
        Ok(Arc::new(Foo {
            _inner: session.resolve_keyed::<Foo>("foo")?,
        }))
    })?;
    builder.finish()?;
    let container = builder.result()?;

    println!("Registrations: {}", container.len());

    let reception = container.resolve::<Reception>()?;
    println!("✓ {}", reception.greeter.greet("visitor"));
    if let Some(clock) = &reception.clock {
        println!("✓ Timed reception, clock running for {:?}", clock.started.elapsed());
    }

    let again = container.resolve::<Reception>()?;
    println!(
        "✓ Fresh reception per request: {}",
        !Arc::ptr_eq(&reception, &again)
    );
    if let (Some(a), Some(b)) = (&reception.clock, &again.clock) {
        println!("✓ Shared clock: {}", Arc::ptr_eq(a, b));
    }

    match container.resolve_keyed::<Foo>("foo") {
        Ok(_) => println!("✗ Self-dependent Foo resolved unexpectedly"),
        Err(e @ DiError::CycleDetected { .. }) => println!("✓ {}", e),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
