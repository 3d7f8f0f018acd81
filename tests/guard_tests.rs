use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use movie_catalog::{
    AppConfig,
    auth::{ADMIN_ONLY, Decision, MEMBERS, PUBLIC, Principal, Role, admit},
    routes::route_table,
    token::TokenService,
};

fn tokens() -> TokenService {
    TokenService::new("guard-tests-secret").unwrap()
}

fn with_header(name: header::HeaderName, value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(name, HeaderValue::from_str(value).unwrap());
    headers
}

fn cookie_for(tokens: &TokenService, user_id: i64, is_admin: bool) -> HeaderMap {
    let token = tokens.issue(user_id, is_admin).unwrap();
    with_header(header::COOKIE, &format!("AccessToken=Bearer%20{token}"))
}

const FORBIDDEN: Decision = Decision::Reject(StatusCode::FORBIDDEN);

#[test]
fn test_public_proceeds_without_credentials() {
    let tokens = tokens();
    assert_eq!(
        admit(&HeaderMap::new(), PUBLIC, &tokens),
        Decision::Proceed(None)
    );

    // Even garbage is never inspected.
    let junk = with_header(header::COOKIE, "AccessToken=nonsense");
    assert_eq!(admit(&junk, PUBLIC, &tokens), Decision::Proceed(None));
}

#[test]
fn test_missing_credential_is_forbidden() {
    assert_eq!(admit(&HeaderMap::new(), MEMBERS, &tokens()), FORBIDDEN);
}

#[test]
fn test_credential_without_bearer_prefix_is_forbidden() {
    let tokens = tokens();
    let token = tokens.issue(1, true).unwrap();
    let headers = with_header(header::COOKIE, &format!("AccessToken={token}"));
    assert_eq!(admit(&headers, ADMIN_ONLY, &tokens), FORBIDDEN);

    let basic = with_header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz");
    assert_eq!(admit(&basic, ADMIN_ONLY, &tokens), FORBIDDEN);
}

#[test]
fn test_unverifiable_token_is_forbidden() {
    let headers = with_header(header::AUTHORIZATION, "Bearer not.a.token");
    assert_eq!(admit(&headers, MEMBERS, &tokens()), FORBIDDEN);
}

#[test]
fn test_admin_only_rejects_client_and_admits_admin() {
    let tokens = tokens();

    assert_eq!(admit(&cookie_for(&tokens, 3, false), ADMIN_ONLY, &tokens), FORBIDDEN);
    assert_eq!(
        admit(&cookie_for(&tokens, 4, true), ADMIN_ONLY, &tokens),
        Decision::Proceed(Some(Principal {
            user_id: 4,
            is_admin: true
        }))
    );
}

#[test]
fn test_roles_are_disjoint() {
    let tokens = tokens();
    let client_only: &[Role] = &[Role::Client];

    assert_eq!(admit(&cookie_for(&tokens, 4, true), client_only, &tokens), FORBIDDEN);
    assert!(matches!(
        admit(&cookie_for(&tokens, 3, false), client_only, &tokens),
        Decision::Proceed(Some(_))
    ));
    assert!(matches!(
        admit(&cookie_for(&tokens, 4, true), MEMBERS, &tokens),
        Decision::Proceed(Some(_))
    ));
}

#[test]
fn test_cookie_wins_over_authorization_header() {
    let tokens = tokens();
    let mut headers = cookie_for(&tokens, 3, false);
    let admin = tokens.issue(4, true).unwrap();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {admin}")).unwrap(),
    );

    assert_eq!(admit(&headers, ADMIN_ONLY, &tokens), FORBIDDEN);
}

// --- Route table policy ---

fn roles_of(config: &AppConfig, method: Method, path: &str) -> &'static [Role] {
    route_table(config)
        .into_iter()
        .find(|entry| *entry.method() == method && entry.path() == path)
        .unwrap_or_else(|| panic!("{method} {path} is not in the route table"))
        .roles()
}

#[test]
fn test_route_table_declares_expected_roles() {
    let config = AppConfig::default();

    assert_eq!(roles_of(&config, Method::GET, "/health"), PUBLIC);
    assert_eq!(roles_of(&config, Method::POST, "/api/auth/signIn"), PUBLIC);
    assert_eq!(roles_of(&config, Method::GET, "/api/movies"), PUBLIC);
    assert_eq!(roles_of(&config, Method::GET, "/api/actors"), MEMBERS);
    assert_eq!(roles_of(&config, Method::GET, "/api/actors/{id}"), MEMBERS);
    assert_eq!(roles_of(&config, Method::POST, "/api/movies"), ADMIN_ONLY);
    assert_eq!(roles_of(&config, Method::DELETE, "/api/actors/{id}"), ADMIN_ONLY);
    assert_eq!(
        roles_of(&config, Method::DELETE, "/api/movies/{id}/actors/{actor_id}"),
        ADMIN_ONLY
    );
}

#[test]
fn test_every_mutation_is_admin_only() {
    for entry in route_table(&AppConfig::default()) {
        if entry.path().starts_with("/api/auth") || *entry.method() == Method::GET {
            continue;
        }
        assert_eq!(entry.roles(), ADMIN_ONLY, "{} {}", entry.method(), entry.path());
    }
}

#[test]
fn test_restricted_catalog_reads_require_members() {
    let config = AppConfig {
        catalog_reads_public: false,
        ..AppConfig::default()
    };

    for path in ["/api/movies", "/api/movies/search", "/api/movies/{id}"] {
        assert_eq!(roles_of(&config, Method::GET, path), MEMBERS, "{path}");
    }
}

#[test]
fn test_route_table_has_no_duplicates() {
    let table = route_table(&AppConfig::default());
    let mut seen = std::collections::HashSet::new();
    for entry in &table {
        assert!(
            seen.insert((entry.method().clone(), entry.path())),
            "duplicate {} {}",
            entry.method(),
            entry.path()
        );
    }
}
