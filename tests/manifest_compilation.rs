// Compiling whole manifests into routing tables
#[cfg(test)]
mod test {
    use gantry::core::{
        DispatchError, HttpMethod, ManifestError, RouteMatch, compile_str, dispatch::resolve,
        routing_table::RoutingTable,
    };

    const SERVICES: &str = r#"
openapi: "3.0.0"
info:
  title: Services
  version: "2.1.0"
tags:
  - name: svcA
    description: Service A
    x-target: https://svcA.internal
  - name: orders
    x-target: http://orders.internal/orders/{orderId}
paths:
  /a/status:
    get:
      summary: Service A status
      x-tag: svcA
  /orders/{orderId}:
    get:
      summary: Fetch order
      x-tag: orders
      parameters:
        - name: orderId
          in: path
          required: true
          schema:
            type: string
      responses:
        200:
          description: The order
        "404":
          description: Unknown order
    patch:
      summary: Amend order
      x-target: http://orders-write.internal/orders/{orderId}
    put:
      summary: ""
      x-target: http://ignored.internal
  /files/{path+}:
    get:
      summary: Download
      x-target: http://files.internal/blobs
  /drafts:
    post:
      summary: ""
"#;

    fn compiled() -> RoutingTable {
        compile_str(SERVICES).expect("manifest compiles")
    }

    #[test]
    fn test_one_entry_per_defined_operation() {
        let table = compiled();

        assert_eq!(table.len(), 3);
        assert_eq!(table.route_count(), 4);
        assert!(table.get("/drafts").is_none());
        assert!(table.upstream("/orders/{orderId}", HttpMethod::Put).is_none());
        for entry in table.entries() {
            for target in entry.methods().values() {
                assert!(!target.upstream_url.is_empty());
            }
        }
    }

    #[test]
    fn test_tag_resolution() {
        let table = compiled();
        assert_eq!(
            table.upstream("/a/status", HttpMethod::Get),
            Some("https://svcA.internal")
        );
        assert_eq!(
            table.upstream("/orders/{orderId}", HttpMethod::Get),
            Some("http://orders.internal/orders/{orderId}")
        );
        assert_eq!(
            table.upstream("/orders/{orderId}", HttpMethod::Patch),
            Some("http://orders-write.internal/orders/{orderId}")
        );
    }

    #[test]
    fn test_operation_metadata_is_kept() {
        let table = compiled();
        let target = table
            .get("/orders/{orderId}")
            .and_then(|entry| entry.target(HttpMethod::Get))
            .unwrap();
        assert_eq!(target.operation.summary, "Fetch order");
        assert_eq!(target.operation.parameters.len(), 1);
        assert_eq!(target.operation.parameters[0].name, "orderId");
        assert_eq!(target.operation.parameters[0].location, "path");
    }

    #[test]
    fn test_lookup_against_compiled_table() {
        let table = compiled();

        match table.lookup(&http::Method::GET, "/files/reports/2024/q1.csv") {
            RouteMatch::Found { captures, .. } => {
                assert_eq!(captures.suffix.as_deref(), Some("reports/2024/q1.csv"));
            }
            _ => panic!("greedy route should match"),
        }
        assert!(matches!(
            table.lookup(&http::Method::DELETE, "/orders/9"),
            RouteMatch::MethodNotAllowed { .. }
        ));
        assert!(matches!(
            table.lookup(&http::Method::GET, "/unknown"),
            RouteMatch::NotFound
        ));
    }

    #[test]
    fn test_literal_path_without_method_does_not_shadow_parameter_path() {
        let table = compile_str(
            r#"
openapi: "3.0.0"
info:
  title: shadow
  version: "1"
paths:
  /users/me:
    post:
      summary: Update profile
      x-target: https://api.internal/profile
  /users/{id}:
    get:
      summary: Get user
      x-target: https://api.internal/users/{id}
"#,
        )
        .unwrap();

        let resolved = resolve(&table, &http::Method::GET, "/users/me", None).unwrap();
        assert_eq!(resolved.url.as_str(), "https://api.internal/users/me");
        assert_eq!(resolved.listening_path, "/users/{id}");

        let resolved = resolve(&table, &http::Method::POST, "/users/me", None).unwrap();
        assert_eq!(resolved.url.as_str(), "https://api.internal/profile");

        assert!(matches!(
            resolve(&table, &http::Method::DELETE, "/users/me", None),
            Err(DispatchError::NoUpstreamForMethod { .. })
        ));
    }

    #[test]
    fn test_single_offending_operation_rejects_everything() {
        let manifest = SERVICES.replace(
            "      summary: Download\n      x-target: http://files.internal/blobs\n",
            "      summary: Download\n",
        );

        match compile_str(&manifest) {
            Err(ManifestError::MissingUpstreamTarget { path, method, .. }) => {
                assert_eq!(path, "/files/{path+}");
                assert_eq!(method, HttpMethod::Get);
            }
            other => panic!("expected missing target, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let manifest = SERVICES.replace("x-tag: svcA", "x-tag: svcB");
        let err = compile_str(&manifest).unwrap_err();
        assert!(err.to_string().contains("svcB"));
    }

    #[test]
    fn test_malformed_documents() {
        for document in [
            "not: [valid",
            "info:\n  title: t\n  version: \"1\"\npaths: {}\n",
            "openapi: \"3.0.0\"\npaths: {}\n",
        ] {
            assert!(matches!(
                compile_str(document),
                Err(ManifestError::InvalidManifestFormat(_))
            ));
        }
    }
}
