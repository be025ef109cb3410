// X509 certificate management
// (c) 2024 Ross Younger

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use rsa::{pkcs1::DecodeRsaPrivateKey as _, pkcs8::DecodePrivateKey as _, traits::PublicKeyParts as _};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use time::OffsetDateTime;
use x509_parser::{
    certificate::X509Certificate,
    extensions::GeneralName,
    public_key::PublicKey,
};

use crate::error::LoadError;

/// In-memory representation of a loaded certificate pair
#[derive(Debug)]
pub struct Certificate {
    /// X509 certificate chain; the first entry is the leaf
    pub chain: Vec<CertificateDer<'static>>,
    /// Private key the leaf certificate relates to
    pub key: PrivateKeyDer<'static>,
    /// Start of validity
    pub not_before: OffsetDateTime,
    /// End of validity
    pub not_after: OffsetDateTime,
    /// Subject common name, if present
    pub common_name: Option<String>,
    /// Subject organization(s), in certificate order
    pub organization: Vec<String>,
    /// Subject alternative names of DNS type
    pub dns_names: Vec<String>,
    /// Subject alternative names of IP address type
    pub ip_addresses: Vec<IpAddr>,
    /// Raw serial number (big-endian)
    pub serial: Vec<u8>,
    /// Does the certificate claim to be a CA?
    pub is_ca: bool,
}

/// The names we learned by parsing the leaf
struct LeafInfo {
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    common_name: Option<String>,
    organization: Vec<String>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    serial: Vec<u8>,
    is_ca: bool,
    modulus: Option<Vec<u8>>,
}

fn strip_leading_zeroes(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

fn ip_from_san(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes)
            .ok()
            .map(|a| IpAddr::V4(Ipv4Addr::from(a))),
        16 => <[u8; 16]>::try_from(bytes)
            .ok()
            .map(|a| IpAddr::V6(Ipv6Addr::from(a))),
        _ => None,
    }
}

fn parse_leaf(der: &[u8], location: &str) -> Result<LeafInfo, LoadError> {
    let parse_err = |reason: String| LoadError::Parse {
        location: location.to_string(),
        reason,
    };
    let (_, x509): (_, X509Certificate<'_>) =
        x509_parser::parse_x509_certificate(der).map_err(|e| parse_err(e.to_string()))?;

    let validity = x509.validity();
    let common_name = x509
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);
    let organization = x509
        .subject()
        .iter_organization()
        .filter_map(|o| o.as_str().ok())
        .map(str::to_string)
        .collect();

    let mut dns_names = Vec::new();
    let mut ip_addresses = Vec::new();
    if let Some(san) = x509
        .subject_alternative_name()
        .map_err(|e| parse_err(e.to_string()))?
    {
        for name in &san.value.general_names {
            match name {
                GeneralName::DNSName(dns) => dns_names.push((*dns).to_string()),
                GeneralName::IPAddress(bytes) => ip_addresses.push(
                    ip_from_san(bytes)
                        .ok_or_else(|| parse_err("malformed IP address SAN".into()))?,
                ),
                _ => (),
            }
        }
    }

    let modulus = match x509.public_key().parsed() {
        Ok(PublicKey::RSA(rsa)) => Some(strip_leading_zeroes(rsa.modulus).to_vec()),
        _ => None,
    };

    Ok(LeafInfo {
        not_before: validity.not_before.to_datetime(),
        not_after: validity.not_after.to_datetime(),
        common_name,
        organization,
        dns_names,
        ip_addresses,
        serial: x509.raw_serial().to_vec(),
        is_ca: x509.is_ca(),
        modulus,
    })
}

/// Extracts the RSA modulus from a private key, big-endian without leading zeroes
fn key_modulus(key: &PrivateKeyDer<'_>, location: &str) -> Result<Vec<u8>, LoadError> {
    let unsupported = |reason: String| LoadError::UnsupportedKey {
        location: location.to_string(),
        reason,
    };
    let rsa = match key {
        PrivateKeyDer::Pkcs1(k) => rsa::RsaPrivateKey::from_pkcs1_der(k.secret_pkcs1_der())
            .map_err(|e| unsupported(e.to_string()))?,
        PrivateKeyDer::Pkcs8(k) => rsa::RsaPrivateKey::from_pkcs8_der(k.secret_pkcs8_der())
            .map_err(|e| unsupported(e.to_string()))?,
        _ => return Err(unsupported("not an RSA key".into())),
    };
    Ok(rsa.n().to_bytes_be())
}

impl Certificate {
    /// Parses a PEM certificate chain and PEM private key.
    ///
    /// `cert_location` and `key_location` are used only for error messages.
    pub fn from_pem(
        cert_pem: &[u8],
        key_pem: &[u8],
        cert_location: &str,
        key_location: &str,
    ) -> Result<Self, LoadError> {
        let chain = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoadError::Parse {
                location: cert_location.to_string(),
                reason: e.to_string(),
            })?;
        let leaf = chain.first().ok_or_else(|| LoadError::MissingCertificate {
            location: cert_location.to_string(),
        })?;

        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| LoadError::Parse {
                location: key_location.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| LoadError::MissingKey {
                location: key_location.to_string(),
            })?;

        let info = parse_leaf(leaf, cert_location)?;
        let key_n = key_modulus(&key, key_location)?;
        if info.modulus.as_deref() != Some(key_n.as_slice()) {
            return Err(LoadError::Mismatch {
                cert: cert_location.to_string(),
                key: key_location.to_string(),
            });
        }

        Ok(Certificate {
            chain,
            key,
            not_before: info.not_before,
            not_after: info.not_after,
            common_name: info.common_name,
            organization: info.organization,
            dns_names: info.dns_names,
            ip_addresses: info.ip_addresses,
            serial: info.serial,
            is_ca: info.is_ca,
        })
    }

    /// Time remaining until expiry, as at `now`. Negative if already expired.
    #[must_use]
    pub fn time_left(&self, now: OffsetDateTime) -> time::Duration {
        self.not_after - now
    }

    /// The length of the validity period
    #[must_use]
    pub fn validity(&self) -> time::Duration {
        self.not_after - self.not_before
    }

    /// Cloning accessor
    #[must_use]
    pub fn cert_chain(&self) -> Vec<CertificateDer<'static>> {
        self.chain.clone()
    }

    /// Serial number as colon-separated hex, for display
    #[must_use]
    pub fn serial_hex(&self) -> String {
        self.serial
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}
