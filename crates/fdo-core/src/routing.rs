//! # Route Table
//!
//! An ordered list of [`RouteDescriptor`]s, each pairing an HTTP method and
//! a segment pattern with an [`Operation`]. Resolution walks the list in
//! registration order and the first structural match wins.
//!
//! Patterns are written as paths with named captures, e.g.
//! `/api/orgs/{org}/fdo/vouchers/{device}`. A capture matches exactly one
//! non-empty path segment. Literal segments match byte-for-byte. There is
//! no wildcard and no trailing-slash folding.
//!
//! The table is immutable after construction and resolution is a pure
//! function, so a single table is shared by every request.

use crate::error::RouteError;

/// HTTP methods the gateway routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl Method {
    /// Parse an upper-case method token. Methods the gateway never routes
    /// on yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }

    /// Method token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named positional captures a pattern may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capture {
    /// `{org}`: organization id.
    Org,
    /// `{device}`: device id.
    Device,
    /// `{name}`: resource name.
    Name,
    /// `{alias}`: public key alias.
    Alias,
}

impl Capture {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "org" => Some(Self::Org),
            "device" => Some(Self::Device),
            "name" => Some(Self::Name),
            "alias" => Some(Self::Alias),
            _ => None,
        }
    }

    /// Name used in patterns.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Org => "org",
            Self::Device => "device",
            Self::Name => "name",
            Self::Alias => "alias",
        }
    }
}

/// Operations the gateway performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Gateway version.
    GetVersion,
    /// Owner Service health passthrough.
    GetOwnerVersion,
    /// Fetch an owner public key by alias.
    GetCertificate,
    /// List devices onboarded under an organization.
    ListVouchers,
    /// Fetch one voucher, org-checked.
    GetVoucher,
    /// Import a voucher and create the device record.
    ImportVoucher,
    /// Set the TO2 redirect address.
    SetRedirect,
    /// Read the TO2 redirect address.
    GetRedirect,
    /// Trigger the TO0 rendezvous step for a device.
    TriggerTo0,
    /// Upload a service-info resource.
    PutResource,
    /// Fetch a service-info resource.
    GetResource,
    /// Upload service-info instructions.
    PutServiceInfo,
}

impl Operation {
    /// Stable name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetVersion => "get_version",
            Self::GetOwnerVersion => "get_owner_version",
            Self::GetCertificate => "get_certificate",
            Self::ListVouchers => "list_vouchers",
            Self::GetVoucher => "get_voucher",
            Self::ImportVoucher => "import_voucher",
            Self::SetRedirect => "set_redirect",
            Self::GetRedirect => "get_redirect",
            Self::TriggerTo0 => "trigger_to0",
            Self::PutResource => "put_resource",
            Self::GetResource => "get_resource",
            Self::PutServiceInfo => "put_service_info",
        }
    }

    /// Whether the operation may run without caller credentials.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::GetVersion | Self::GetOwnerVersion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(Capture),
}

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    operation: Operation,
}

impl RouteDescriptor {
    /// Parse `pattern` into a descriptor.
    pub fn new(method: Method, pattern: &str, operation: Operation) -> Result<Self, RouteError> {
        let rest = pattern
            .strip_prefix('/')
            .ok_or_else(|| RouteError::NotAbsolute(pattern.to_string()))?;

        let mut segments = Vec::new();
        let mut seen = Vec::new();
        for raw in rest.split('/') {
            if raw.is_empty() {
                return Err(RouteError::EmptySegment(pattern.to_string()));
            }
            match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => {
                    let capture =
                        Capture::from_name(name).ok_or_else(|| RouteError::UnknownCapture {
                            pattern: pattern.to_string(),
                            capture: name.to_string(),
                        })?;
                    if seen.contains(&capture) {
                        return Err(RouteError::DuplicateCapture {
                            pattern: pattern.to_string(),
                            capture: name.to_string(),
                        });
                    }
                    seen.push(capture);
                    segments.push(Segment::Capture(capture));
                }
                None => segments.push(Segment::Literal(raw.to_string())),
            }
        }

        Ok(Self {
            method,
            pattern: pattern.to_string(),
            segments,
            operation,
        })
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Operation selected by this descriptor.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Whether the pattern carries `capture`.
    pub fn has_capture(&self, capture: Capture) -> bool {
        self.segments.contains(&Segment::Capture(capture))
    }

    fn match_segments(&self, path: &[&str]) -> Option<Vec<(Capture, String)>> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut captures = Vec::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(lit) if lit.as_str() == *actual => {}
                Segment::Capture(c) if !actual.is_empty() => captures.push((*c, actual.to_string())),
                _ => return None,
            }
        }
        Some(captures)
    }

    /// Whether some request could match both `self` and `other`.
    fn overlaps(&self, other: &Self) -> bool {
        self.method == other.method
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    _ => true,
                })
    }
}

/// Result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    operation: Operation,
    pattern: String,
    captures: Vec<(Capture, String)>,
}

impl RouteMatch {
    /// Selected operation.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Pattern of the descriptor that matched.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Value captured for `capture`, if the pattern has one.
    pub fn get(&self, capture: Capture) -> Option<&str> {
        self.captures
            .iter()
            .find(|(c, _)| *c == capture)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Build a table from descriptors, keeping their order.
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }

    /// The gateway's route table.
    ///
    /// The three organization-less voucher routes come last; they resolve
    /// the organization from `?orgid=` or the caller's credentials.
    pub fn standard() -> Result<Self, RouteError> {
        use Method::{Get, Post};
        use Operation::*;

        let table = [
            (Get, "/api/version", GetVersion),
            (Get, "/api/fdo/version", GetOwnerVersion),
            (Get, "/api/orgs/{org}/fdo/certificate/{alias}", GetCertificate),
            (Get, "/api/orgs/{org}/fdo/vouchers", ListVouchers),
            (Get, "/api/orgs/{org}/fdo/vouchers/{device}", GetVoucher),
            (Post, "/api/orgs/{org}/fdo/vouchers", ImportVoucher),
            (Post, "/api/orgs/{org}/fdo/redirect", SetRedirect),
            (Get, "/api/orgs/{org}/fdo/redirect", GetRedirect),
            (Get, "/api/orgs/{org}/fdo/to0/{device}", TriggerTo0),
            (Post, "/api/orgs/{org}/fdo/resource/{name}", PutResource),
            (Get, "/api/orgs/{org}/fdo/resource/{name}", GetResource),
            (Post, "/api/orgs/{org}/fdo/svi", PutServiceInfo),
            (Get, "/api/fdo/vouchers", ListVouchers),
            (Get, "/api/fdo/vouchers/{device}", GetVoucher),
            (Post, "/api/fdo/vouchers", ImportVoucher),
        ];

        table
            .into_iter()
            .map(|(method, pattern, op)| RouteDescriptor::new(method, pattern, op))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Descriptors in evaluation order.
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Resolve a request. The path must not include the query string.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let rest = path.strip_prefix('/')?;
        let segments: Vec<&str> = rest.split('/').collect();

        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                route.match_segments(&segments).map(|captures| RouteMatch {
                    operation: route.operation,
                    pattern: route.pattern.clone(),
                    captures,
                })
            })
    }

    /// Index pairs `(earlier, later)` where the earlier descriptor can
    /// shadow the later one. Empty for a table whose first-match order is
    /// irrelevant.
    pub fn shadowed(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.routes.iter().enumerate() {
            for (j, b) in self.routes.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> RouteTable {
        RouteTable::standard().unwrap()
    }

    #[test]
    fn standard_table_has_no_shadowing() {
        assert!(table().shadowed().is_empty());
    }

    #[test]
    fn resolves_every_documented_route() {
        let t = table();
        let cases = [
            (Method::Get, "/api/version", Operation::GetVersion),
            (Method::Get, "/api/fdo/version", Operation::GetOwnerVersion),
            (Method::Get, "/api/orgs/acme/fdo/certificate/SECP256R1", Operation::GetCertificate),
            (Method::Get, "/api/orgs/acme/fdo/vouchers", Operation::ListVouchers),
            (Method::Get, "/api/orgs/acme/fdo/vouchers/abc", Operation::GetVoucher),
            (Method::Post, "/api/orgs/acme/fdo/vouchers", Operation::ImportVoucher),
            (Method::Post, "/api/orgs/acme/fdo/redirect", Operation::SetRedirect),
            (Method::Get, "/api/orgs/acme/fdo/redirect", Operation::GetRedirect),
            (Method::Get, "/api/orgs/acme/fdo/to0/abc", Operation::TriggerTo0),
            (Method::Post, "/api/orgs/acme/fdo/resource/x.sh", Operation::PutResource),
            (Method::Get, "/api/orgs/acme/fdo/resource/x.sh", Operation::GetResource),
            (Method::Post, "/api/orgs/acme/fdo/svi", Operation::PutServiceInfo),
            (Method::Get, "/api/fdo/vouchers", Operation::ListVouchers),
            (Method::Get, "/api/fdo/vouchers/abc", Operation::GetVoucher),
            (Method::Post, "/api/fdo/vouchers", Operation::ImportVoucher),
        ];
        for (method, path, op) in cases {
            let m = t.resolve(method, path).unwrap_or_else(|| panic!("{method} {path}"));
            assert_eq!(m.operation(), op, "{method} {path}");
        }
    }

    #[test]
    fn captures_are_extracted() {
        let m = table()
            .resolve(Method::Get, "/api/orgs/acme/fdo/vouchers/dev-1")
            .unwrap();
        assert_eq!(m.get(Capture::Org), Some("acme"));
        assert_eq!(m.get(Capture::Device), Some("dev-1"));
        assert_eq!(m.get(Capture::Name), None);
        assert_eq!(m.pattern(), "/api/orgs/{org}/fdo/vouchers/{device}");
    }

    #[test]
    fn org_less_routes_have_no_org_capture() {
        let m = table().resolve(Method::Post, "/api/fdo/vouchers").unwrap();
        assert_eq!(m.get(Capture::Org), None);
    }

    #[test]
    fn wrong_method_is_not_found() {
        let t = table();
        assert!(t.resolve(Method::Post, "/api/version").is_none());
        assert!(t.resolve(Method::Post, "/api/orgs/acme/fdo/to0/abc").is_none());
        assert!(t.resolve(Method::Get, "/api/orgs/acme/fdo/svi").is_none());
    }

    #[test]
    fn structural_mismatches_are_not_found() {
        let t = table();
        for path in [
            "/api/version/",
            "/api/orgs//fdo/vouchers",
            "/api/orgs/acme/fdo/vouchers/",
            "/api/orgs/acme/fdo/vouchers/a/b",
            "/api/orgs/acme/fdo",
            "api/version",
            "",
            "/",
        ] {
            assert!(t.resolve(Method::Get, path).is_none(), "{path}");
        }
    }

    #[test]
    fn first_match_wins_when_patterns_overlap() {
        let t = RouteTable::new(vec![
            RouteDescriptor::new(Method::Get, "/api/orgs/{org}/fdo/resource/{name}", Operation::GetResource)
                .unwrap(),
            RouteDescriptor::new(Method::Get, "/api/orgs/{org}/fdo/resource/special", Operation::GetVersion)
                .unwrap(),
        ]);
        assert_eq!(t.shadowed(), vec![(0, 1)]);
        let m = t.resolve(Method::Get, "/api/orgs/acme/fdo/resource/special").unwrap();
        assert_eq!(m.operation(), Operation::GetResource);
    }

    #[test]
    fn pattern_errors() {
        assert_eq!(
            RouteDescriptor::new(Method::Get, "api", Operation::GetVersion).unwrap_err(),
            RouteError::NotAbsolute("api".into())
        );
        assert!(matches!(
            RouteDescriptor::new(Method::Get, "/a/{bogus}", Operation::GetVersion),
            Err(RouteError::UnknownCapture { .. })
        ));
        assert!(matches!(
            RouteDescriptor::new(Method::Get, "/a/{org}/{org}", Operation::GetVersion),
            Err(RouteError::DuplicateCapture { .. })
        ));
        assert!(matches!(
            RouteDescriptor::new(Method::Get, "/a//b", Operation::GetVersion),
            Err(RouteError::EmptySegment(_))
        ));
    }

    #[test]
    fn only_version_routes_are_public() {
        for route in table().routes() {
            let public = route.operation().is_public();
            assert_eq!(public, !route.pattern().contains("{org}") && route.pattern().ends_with("version"));
        }
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("api".to_string()),
            Just("orgs".to_string()),
            Just("fdo".to_string()),
            Just("vouchers".to_string()),
            Just("version".to_string()),
            Just("resource".to_string()),
            Just("svi".to_string()),
            Just(String::new()),
            "[a-z0-9-]{1,8}",
        ]
    }

    proptest! {
        #[test]
        fn at_most_one_descriptor_matches(
            segs in proptest::collection::vec(segment(), 0..7),
            post in any::<bool>(),
        ) {
            let t = table();
            let method = if post { Method::Post } else { Method::Get };
            let path = format!("/{}", segs.join("/"));
            let parts: Vec<&str> = path[1..].split('/').collect();
            let matching = t
                .routes()
                .iter()
                .filter(|r| r.method() == method && r.match_segments(&parts).is_some())
                .count();
            prop_assert!(matching <= 1);
            prop_assert_eq!(t.resolve(method, &path).is_some(), matching == 1);
        }

        #[test]
        fn resolution_is_deterministic(segs in proptest::collection::vec(segment(), 0..7)) {
            let t = table();
            let path = format!("/{}", segs.join("/"));
            prop_assert_eq!(t.resolve(Method::Get, &path), t.resolve(Method::Get, &path));
        }
    }
}
