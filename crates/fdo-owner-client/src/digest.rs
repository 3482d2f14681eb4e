//! HTTP Digest authentication (RFC 7616, MD5 family).
//!
//! The Owner Service protects its API with Digest auth. The client sends a
//! request without credentials, reads the `WWW-Authenticate` challenge from
//! the 401, and re-sends once with an `Authorization` header computed here.
//!
//! Supported: `MD5` and `MD5-sess`, with `qop=auth`, `qop=auth-int`, or the
//! legacy RFC 2069 form when the server offers no qop.

use md5::{Digest as _, Md5};
use rand_core::{OsRng, RngCore};

/// Errors answering a digest challenge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// The challenge scheme is not `Digest`.
    #[error("challenge is not a Digest challenge")]
    NotDigest,
    /// A required challenge parameter is absent.
    #[error("challenge is missing \"{0}\"")]
    MissingParam(&'static str),
    /// The challenge names an algorithm other than MD5 / MD5-sess.
    #[error("unsupported digest algorithm \"{0}\"")]
    UnsupportedAlgorithm(String),
    /// The challenge only offers qop values this client does not implement.
    #[error("unsupported digest qop \"{0}\"")]
    UnsupportedQop(String),
    /// The header could not be tokenized.
    #[error("malformed digest challenge")]
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Md5,
    Md5Sess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Qop {
    Auth,
    AuthInt,
}

impl Qop {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::AuthInt => "auth-int",
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    realm: String,
    nonce: String,
    opaque: Option<String>,
    algorithm: Algorithm,
    /// Name as sent by the server, echoed back verbatim.
    algorithm_token: Option<String>,
    qop: Option<Qop>,
}

/// One request's worth of input to [`DigestChallenge::respond`].
#[derive(Debug, Clone, Copy)]
pub struct DigestRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub method: &'a str,
    /// Request target as sent on the request line (path and query).
    pub uri: &'a str,
    pub body: &'a [u8],
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value.
    pub fn parse(header: &str) -> Result<Self, DigestError> {
        let header = header.trim_start();
        let (scheme, rest) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("digest") {
            return Err(DigestError::NotDigest);
        }

        let params = parse_params(rest)?;
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.clone())
        };

        let realm = get("realm").ok_or(DigestError::MissingParam("realm"))?;
        let nonce = get("nonce").ok_or(DigestError::MissingParam("nonce"))?;

        let algorithm_token = get("algorithm");
        let algorithm = match algorithm_token.as_deref() {
            None => Algorithm::Md5,
            Some(a) if a.eq_ignore_ascii_case("md5") => Algorithm::Md5,
            Some(a) if a.eq_ignore_ascii_case("md5-sess") => Algorithm::Md5Sess,
            Some(a) => return Err(DigestError::UnsupportedAlgorithm(a.to_string())),
        };

        let qop = match get("qop") {
            None => None,
            Some(offered) => {
                let options: Vec<&str> = offered.split(',').map(str::trim).collect();
                if options.iter().any(|q| q.eq_ignore_ascii_case("auth")) {
                    Some(Qop::Auth)
                } else if options.iter().any(|q| q.eq_ignore_ascii_case("auth-int")) {
                    Some(Qop::AuthInt)
                } else {
                    return Err(DigestError::UnsupportedQop(offered));
                }
            }
        };

        Ok(Self {
            realm,
            nonce,
            opaque: get("opaque"),
            algorithm,
            algorithm_token,
            qop,
        })
    }

    /// Realm announced by the server.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Compute the `Authorization` header value using a fresh client nonce.
    pub fn respond(&self, req: &DigestRequest<'_>) -> String {
        self.respond_with(req, &client_nonce(), 1)
    }

    /// Compute the `Authorization` header value with an explicit client
    /// nonce and nonce count.
    pub fn respond_with(&self, req: &DigestRequest<'_>, cnonce: &str, nc: u32) -> String {
        let nc = format!("{nc:08x}");

        let mut ha1 = md5_hex(format!("{}:{}:{}", req.username, self.realm, req.password));
        if self.algorithm == Algorithm::Md5Sess {
            ha1 = md5_hex(format!("{ha1}:{}:{cnonce}", self.nonce));
        }

        let ha2 = match self.qop {
            Some(Qop::AuthInt) => {
                md5_hex(format!("{}:{}:{}", req.method, req.uri, md5_hex(req.body)))
            }
            _ => md5_hex(format!("{}:{}", req.method, req.uri)),
        };

        let response = match self.qop {
            Some(qop) => md5_hex(format!(
                "{ha1}:{}:{nc}:{cnonce}:{}:{ha2}",
                self.nonce,
                qop.as_str()
            )),
            None => md5_hex(format!("{ha1}:{}:{ha2}", self.nonce)),
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{response}\"",
            quote(req.username),
            quote(&self.realm),
            quote(&self.nonce),
            quote(req.uri),
        );
        if let Some(algorithm) = &self.algorithm_token {
            header.push_str(&format!(", algorithm={algorithm}"));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{}\"", quote(opaque)));
        }
        if let Some(qop) = self.qop {
            header.push_str(&format!(", qop={}, nc={nc}, cnonce=\"{cnonce}\"", qop.as_str()));
        }
        header
    }
}

fn md5_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(data.as_ref()))
}

fn client_nonce() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Split `k=v, k="quoted, value"` into pairs.
fn parse_params(input: &str) -> Result<Vec<(String, String)>, DigestError> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if key.is_empty() || chars.next() != Some('=') {
            return Err(DigestError::Malformed);
        }
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(DigestError::Malformed);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim_end().to_string();
        }
        params.push((key, value));
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 2617 section 3.5 example.
    const RFC_CHALLENGE: &str = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;

    fn rfc_request() -> DigestRequest<'static> {
        DigestRequest {
            username: "Mufasa",
            password: "Circle Of Life",
            method: "GET",
            uri: "/dir/index.html",
            body: b"",
        }
    }

    #[test]
    fn parses_rfc_challenge() {
        let c = DigestChallenge::parse(RFC_CHALLENGE).unwrap();
        assert_eq!(c.realm(), "testrealm@host.com");
        assert_eq!(c.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(c.opaque.as_deref(), Some("5ccc069c403ebaf9f0171e9517f40e41"));
        assert_eq!(c.qop, Some(Qop::Auth));
        assert_eq!(c.algorithm, Algorithm::Md5);
    }

    #[test]
    fn computes_rfc_response() {
        let c = DigestChallenge::parse(RFC_CHALLENGE).unwrap();
        let header = c.respond_with(&rfc_request(), "0a4f113b", 1);
        assert!(header.starts_with("Digest username=\"Mufasa\""));
        assert!(header.contains("response=\"6629fae49393a05397450978507c4ef1\""));
        assert!(header.contains("qop=auth, nc=00000001, cnonce=\"0a4f113b\""));
        assert!(header.contains("opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""));
    }

    #[test]
    fn legacy_challenge_without_qop() {
        let c = DigestChallenge::parse(r#"Digest realm="r", nonce="n""#).unwrap();
        let header = c.respond_with(&rfc_request(), "ignored", 1);
        let ha1 = md5_hex("Mufasa:r:Circle Of Life");
        let ha2 = md5_hex("GET:/dir/index.html");
        let expected = md5_hex(format!("{ha1}:n:{ha2}"));
        assert!(header.contains(&format!("response=\"{expected}\"")));
        assert!(!header.contains("qop="));
        assert!(!header.contains("cnonce"));
    }

    #[test]
    fn md5_sess_rehashes_ha1() {
        let c = DigestChallenge::parse(r#"Digest realm="r", nonce="n", qop="auth", algorithm=MD5-sess"#).unwrap();
        let header = c.respond_with(&rfc_request(), "cn", 1);
        let ha1 = md5_hex(format!("{}:n:cn", md5_hex("Mufasa:r:Circle Of Life")));
        let ha2 = md5_hex("GET:/dir/index.html");
        let expected = md5_hex(format!("{ha1}:n:00000001:cn:auth:{ha2}"));
        assert!(header.contains(&format!("response=\"{expected}\"")));
        assert!(header.contains("algorithm=MD5-sess"));
    }

    #[test]
    fn auth_int_hashes_body() {
        let c = DigestChallenge::parse(r#"Digest realm="r", nonce="n", qop="auth-int""#).unwrap();
        let req = DigestRequest {
            method: "POST",
            body: b"voucher",
            ..rfc_request()
        };
        let header = c.respond_with(&req, "cn", 1);
        let ha1 = md5_hex("Mufasa:r:Circle Of Life");
        let ha2 = md5_hex(format!("POST:/dir/index.html:{}", md5_hex("voucher")));
        let expected = md5_hex(format!("{ha1}:n:00000001:cn:auth-int:{ha2}"));
        assert!(header.contains(&format!("response=\"{expected}\"")));
    }

    #[test]
    fn rejects_other_schemes_and_algorithms() {
        assert_eq!(DigestChallenge::parse("Basic realm=\"x\""), Err(DigestError::NotDigest));
        assert_eq!(
            DigestChallenge::parse(r#"Digest realm="r", nonce="n", algorithm=SHA-256"#),
            Err(DigestError::UnsupportedAlgorithm("SHA-256".into()))
        );
        assert_eq!(
            DigestChallenge::parse(r#"Digest realm="r""#),
            Err(DigestError::MissingParam("nonce"))
        );
        assert_eq!(
            DigestChallenge::parse(r#"Digest realm="r, nonce="n""#),
            Err(DigestError::Malformed)
        );
    }

    #[test]
    fn quoted_values_keep_commas_and_escapes() {
        let c = DigestChallenge::parse(r#"Digest realm="a, \"b\"", nonce=abc"#).unwrap();
        assert_eq!(c.realm(), "a, \"b\"");
        assert_eq!(c.nonce, "abc");
    }

    #[test]
    fn fresh_client_nonces_differ() {
        assert_ne!(client_nonce(), client_nonce());
    }
}
