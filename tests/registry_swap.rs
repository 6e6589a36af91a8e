// Routing table hot swap under concurrent readers
#[cfg(test)]
mod test {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
    };

    use gantry::core::{
        HttpMethod, RouteRegistry, compile_str, routing_table::RoutingTable,
    };

    const PATHS: usize = 16;

    /// A table whose every route points at the same generation's host.
    fn generation(n: usize) -> RoutingTable {
        let mut manifest = String::from(
            "openapi: \"3.0.0\"\ninfo:\n  title: swap\n  version: \"1\"\npaths:\n",
        );
        for i in 0..PATHS {
            manifest.push_str(&format!(
                "  /svc{i}/{{id}}:\n    get:\n      summary: s{i}\n      x-target: http://gen{n}.internal/{i}/{{id}}\n"
            ));
        }
        compile_str(&manifest).unwrap()
    }

    fn generation_of(table: &RoutingTable) -> Option<String> {
        let hosts: Vec<String> = (0..PATHS)
            .map(|i| {
                let upstream = table
                    .upstream(&format!("/svc{i}/{{id}}"), HttpMethod::Get)
                    .unwrap();
                upstream.split('/').nth(2).unwrap().to_string()
            })
            .collect();
        hosts
            .iter()
            .all(|host| host == &hosts[0])
            .then(|| hosts[0].clone())
    }

    #[test]
    fn test_readers_never_observe_a_mixed_table() {
        let registry = Arc::new(RouteRegistry::new(generation(0)));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut last_revision = 0;
                    let mut observed = 0usize;
                    while !done.load(Ordering::Acquire) {
                        let snapshot = registry.snapshot();
                        assert!(
                            generation_of(&snapshot).is_some(),
                            "snapshot mixes generations"
                        );
                        assert!(snapshot.revision() >= last_revision);
                        last_revision = snapshot.revision();
                        observed += 1;
                    }
                    observed
                })
            })
            .collect();

        for n in 1..=50 {
            registry.replace(generation(n));
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(registry.revision(), 51);
        assert_eq!(
            generation_of(&registry.snapshot()).as_deref(),
            Some("gen50.internal")
        );
    }

    #[test]
    fn test_held_snapshot_survives_replace() {
        let registry = RouteRegistry::new(generation(1));
        let held = registry.snapshot();

        let previous = registry.replace(generation(2));

        assert_eq!(generation_of(&held).as_deref(), Some("gen1.internal"));
        assert_eq!(generation_of(&previous).as_deref(), Some("gen1.internal"));
        assert_eq!(
            generation_of(&registry.snapshot()).as_deref(),
            Some("gen2.internal")
        );
        assert!(registry.snapshot().revision() > held.revision());
    }

    #[test]
    fn test_concurrent_writers_assign_distinct_revisions() {
        let registry = Arc::new(RouteRegistry::empty());

        let writers: Vec<_> = (1..=8)
            .map(|n| {
                let registry = registry.clone();
                thread::spawn(move || registry.replace(generation(n)).revision())
            })
            .collect();

        let mut replaced: Vec<u64> = writers.into_iter().map(|w| w.join().unwrap()).collect();
        replaced.sort_unstable();
        assert_eq!(replaced, (1..=8).collect::<Vec<u64>>());
        assert_eq!(registry.revision(), 9);
    }
}
