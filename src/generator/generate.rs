// Certificate construction
// (c) 2024 Ross Younger

use std::net::IpAddr;

use rand::thread_rng;
use rsa::{
    pkcs1::{EncodeRsaPrivateKey as _, LineEnding},
    pkcs1v15::{Signature, SigningKey},
    pkcs8::EncodePublicKey as _,
    RsaPrivateKey,
};
use sha2::{Digest as _, Sha256};
use time::OffsetDateTime;
use tracing::debug;
use x509_cert::{
    attr::AttributeTypeAndValue,
    builder::{Builder as _, CertificateBuilder, Profile},
    der::{
        asn1::{GeneralizedTime, Ia5String, OctetString, SetOfVec, UtcTime, Utf8StringRef},
        oid::ObjectIdentifier,
        Any, DateTime, Decode as _, EncodePem as _,
    },
    ext::pkix::{
        name::GeneralName, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
        SubjectAltName,
    },
    name::{Name, RdnSequence, RelativeDistinguishedName},
    serial_number::SerialNumber,
    spki::SubjectPublicKeyInfoOwned,
    time::{Time, Validity},
};

use crate::{
    config::{Configuration, SerialPolicy},
    error::Error,
};

const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const KP_SERVER_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.1");
const KP_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");

/// A freshly generated certificate and key, PEM encoded and ready to store
pub(crate) struct Generated {
    pub(crate) cert_pem: String,
    pub(crate) key_pem: String,
}

impl std::fmt::Debug for Generated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generated")
            .field("cert_pem", &self.cert_pem)
            .finish_non_exhaustive()
    }
}

/// Splits hosts into IP addresses and DNS names, preserving order within each list
pub(crate) fn classify_hosts<S: AsRef<str>>(hosts: &[S]) -> (Vec<IpAddr>, Vec<String>) {
    let mut ips = Vec::new();
    let mut names = Vec::new();
    for h in hosts {
        let h = h.as_ref();
        match h.parse::<IpAddr>() {
            Ok(ip) => ips.push(ip),
            Err(_) => names.push(h.to_string()),
        }
    }
    (ips, names)
}

/// Current time, truncated to whole seconds (X509 validity has no finer resolution)
pub(crate) fn now() -> Result<OffsetDateTime, Error> {
    OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .map_err(Error::certificate_build)
}

/// RFC 5280 encoding: `UTCTime` through 2049, `GeneralizedTime` from 2050
fn x509_time(t: OffsetDateTime) -> Result<Time, Error> {
    let since_epoch = std::time::Duration::try_from(t - OffsetDateTime::UNIX_EPOCH)
        .map_err(Error::certificate_build)?;
    let dt = DateTime::from_unix_duration(since_epoch).map_err(Error::certificate_build)?;
    if dt.year() < 2050 {
        Ok(Time::UtcTime(
            UtcTime::from_date_time(dt).map_err(Error::certificate_build)?,
        ))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(dt)))
    }
}

fn validity(config: &Configuration, not_before: OffsetDateTime) -> Result<Validity, Error> {
    let period = time::Duration::try_from(*config.duration).map_err(Error::certificate_build)?;
    let not_after = not_before
        .checked_add(period)
        .ok_or_else(|| Error::certificate_build("certificate validity period is too long"))?;
    Ok(Validity {
        not_before: x509_time(not_before)?,
        not_after: x509_time(not_after)?,
    })
}

fn rdn(oid: ObjectIdentifier, value: &str) -> x509_cert::der::Result<RelativeDistinguishedName> {
    let value = Any::encode_from(&Utf8StringRef::new(value)?)?;
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])?;
    Ok(RelativeDistinguishedName(set))
}

/// Common name, then one RDN per organization in configured order
fn subject(config: &Configuration) -> Result<Name, Error> {
    let mut rdns = Vec::with_capacity(1 + config.organization.len());
    rdns.push(rdn(COMMON_NAME, &config.common_name).map_err(Error::certificate_build)?);
    for org in &config.organization {
        rdns.push(rdn(ORGANIZATION_NAME, org).map_err(Error::certificate_build)?);
    }
    Ok(RdnSequence(rdns))
}

fn subject_alt_names(hosts: &[String]) -> Result<Vec<GeneralName>, Error> {
    let (ips, names) = classify_hosts(hosts);
    let mut sans = Vec::with_capacity(hosts.len());
    for ip in ips {
        let octets = match ip {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        sans.push(GeneralName::IpAddress(
            OctetString::new(octets).map_err(Error::certificate_build)?,
        ));
    }
    for name in names {
        sans.push(GeneralName::DnsName(
            Ia5String::new(&name).map_err(Error::certificate_build)?,
        ));
    }
    Ok(sans)
}

/// `Fixed` is always 1; `Unique` is derived from a hash of the public key
fn serial_number(policy: SerialPolicy, spki_der: &[u8]) -> Result<SerialNumber, Error> {
    match policy {
        SerialPolicy::Fixed => SerialNumber::new(&[1]),
        SerialPolicy::Unique => {
            let digest = Sha256::digest(spki_der);
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&digest[..16]);
            // positive, with no leading zero octet
            bytes[0] = (bytes[0] & 0x7f) | 0x40;
            SerialNumber::new(&bytes)
        }
    }
    .map_err(Error::certificate_build)
}

/// Generates a new RSA key and a self-signed CA certificate for it, valid from `not_before`.
///
/// This is CPU intensive: for large key sizes it may take several seconds.
pub(crate) fn generate(
    config: &Configuration,
    not_before: OffsetDateTime,
) -> Result<Generated, Error> {
    let bits = config.bits;
    let key_err = |e: rsa::Error| Error::KeyGeneration {
        bits,
        source: e.into(),
    };

    debug!("generating {bits}-bit RSA key");
    let key = RsaPrivateKey::new(&mut thread_rng(), usize::from(bits)).map_err(key_err)?;
    let key_pem = key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| key_err(e.into()))?;

    let spki_der = key
        .to_public_key()
        .to_public_key_der()
        .map_err(Error::certificate_build)?;
    let spki = SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes())
        .map_err(Error::certificate_build)?;

    let signer = SigningKey::<Sha256>::new(key);
    let mut builder = CertificateBuilder::new(
        // self-signed, with exactly the extensions added below
        Profile::Manual { issuer: None },
        serial_number(config.serial, spki_der.as_bytes())?,
        validity(config, not_before)?,
        subject(config)?,
        spki,
        &signer,
    )
    .map_err(Error::certificate_build)?;

    builder
        .add_extension(&BasicConstraints {
            ca: true,
            path_len_constraint: None,
        })
        .map_err(Error::certificate_build)?;
    builder
        .add_extension(&KeyUsage(
            KeyUsages::KeyEncipherment | KeyUsages::DigitalSignature | KeyUsages::KeyCertSign,
        ))
        .map_err(Error::certificate_build)?;
    builder
        .add_extension(&ExtendedKeyUsage(vec![KP_CLIENT_AUTH, KP_SERVER_AUTH]))
        .map_err(Error::certificate_build)?;
    let sans = subject_alt_names(&config.hosts)?;
    if !sans.is_empty() {
        builder
            .add_extension(&SubjectAltName(sans))
            .map_err(Error::certificate_build)?;
    }

    let cert = builder
        .build::<Signature>()
        .map_err(Error::certificate_build)?;
    let cert_pem = cert
        .to_pem(LineEnding::LF)
        .map_err(Error::certificate_build)?;

    Ok(Generated {
        cert_pem,
        key_pem: key_pem.to_string(),
    })
}
