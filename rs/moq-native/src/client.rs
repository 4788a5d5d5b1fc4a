use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use url::Url;

use moq_core::SessionMode;

/// TLS configuration for the client.
///
/// Verification is on by default; [`ClientTls::disable_verify`] turns it off for local
/// development, and [`ClientTls::root_cert_path`] pins a specific root instead of the platform
/// trust store.
#[derive(Clone, Debug, Default)]
pub struct ClientTls {
	pub disable_verify: bool,
	pub root_cert_path: Option<PathBuf>,
}

/// Configuration for the MoQ client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Local UDP socket to bind. Defaults to `[::]:0`; `0.0.0.0:0` is the IPv4 alternate.
	pub bind: SocketAddr,
	pub tls: ClientTls,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			bind: "[::]:0".parse().unwrap(),
			tls: ClientTls::default(),
		}
	}
}

impl ClientConfig {
	/// Build the rustls config and QUIC endpoint, returning a ready-to-use [`Client`].
	pub fn init(self) -> anyhow::Result<Client> {
		let tls = self.build_tls_config()?;

		let socket = std::net::UdpSocket::bind(self.bind).context("failed to bind UDP socket")?;
		let runtime = quinn::default_runtime().context("must be called from within a tokio runtime")?;
		let endpoint = quinn::Endpoint::new(quinn::EndpointConfig::default(), None, socket, runtime)
			.context("failed to create QUIC endpoint")?;

		Ok(Client {
			endpoint,
			tls: Arc::new(tls),
		})
	}

	fn build_tls_config(&self) -> anyhow::Result<rustls::ClientConfig> {
		let mut roots = rustls::RootCertStore::empty();

		if let Some(path) = &self.tls.root_cert_path {
			let file = std::fs::File::open(path).context("failed to open tls-root-cert-path")?;
			let mut reader = std::io::BufReader::new(file);
			let root = rustls_pemfile::certs(&mut reader)
				.next()
				.context("no roots found in tls-root-cert-path")?
				.context("failed to read root cert")?;
			roots.add(root).context("failed to add root cert")?;
		} else {
			let native = rustls_native_certs::load_native_certs();
			for err in native.errors {
				tracing::warn!(%err, "failed to load a native root cert");
			}
			for cert in native.certs {
				roots.add(cert).context("failed to add native root cert")?;
			}
		}

		let mut tls = rustls::ClientConfig::builder()
			.with_root_certificates(roots)
			.with_no_client_auth();

		if self.tls.disable_verify {
			tracing::warn!("TLS certificate verification is disabled; this connection can be intercepted");
			tls.dangerous()
				.set_certificate_verifier(Arc::new(danger::NoVerify::default()));
		}

		Ok(tls)
	}
}

/// A client capable of establishing MoQ sessions over QUIC.
///
/// Create via [`ClientConfig::init`].
#[derive(Clone)]
pub struct Client {
	endpoint: quinn::Endpoint,
	tls: Arc<rustls::ClientConfig>,
}

impl Client {
	/// Establish a QUIC connection to `url` and perform the MoQ handshake in `mode`.
	pub async fn connect(
		&self,
		url: Url,
		mode: SessionMode,
	) -> anyhow::Result<moq_core::Session<web_transport_quinn::Session>> {
		let host = url.host_str().context("url is missing a host")?.to_string();
		let port = url.port_or_known_default().unwrap_or(443);

		let remote = tokio::net::lookup_host((host.as_str(), port))
			.await
			.with_context(|| format!("dns lookup failed for {host}:{port}"))?
			.next()
			.context("dns lookup returned no addresses")?;

		let mut tls = (*self.tls).clone();
		tls.alpn_protocols = moq_core::ALPNS.iter().map(|alpn| alpn.as_bytes().to_vec()).collect();

		let quic_tls: quinn::crypto::rustls::QuicClientConfig =
			tls.try_into().context("failed to build QUIC TLS config")?;
		let quinn_config = quinn::ClientConfig::new(Arc::new(quic_tls));

		let connecting = self
			.endpoint
			.connect_with(quinn_config, remote, &host)
			.context("failed to start QUIC handshake")?;
		let connection = connecting.await.context("QUIC handshake failed")?;

		let session = web_transport_quinn::Session::connect(connection, &url)
			.await
			.context("webtransport handshake failed")?;

		moq_core::Session::connect(session, mode).await.context("moq handshake failed")
	}
}

mod danger {
	use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
	use rustls::pki_types::{CertificateDer, ServerName, UnixTime};

	#[derive(Debug)]
	pub struct NoVerify(rustls::crypto::CryptoProvider);

	impl Default for NoVerify {
		fn default() -> Self {
			Self(rustls::crypto::ring::default_provider())
		}
	}

	impl ServerCertVerifier for NoVerify {
		fn verify_server_cert(
			&self,
			_end_entity: &CertificateDer<'_>,
			_intermediates: &[CertificateDer<'_>],
			_server_name: &ServerName<'_>,
			_ocsp: &[u8],
			_now: UnixTime,
		) -> Result<ServerCertVerified, rustls::Error> {
			Ok(ServerCertVerified::assertion())
		}

		fn verify_tls12_signature(
			&self,
			message: &[u8],
			cert: &CertificateDer<'_>,
			dss: &rustls::DigitallySignedStruct,
		) -> Result<HandshakeSignatureValid, rustls::Error> {
			rustls::crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
		}

		fn verify_tls13_signature(
			&self,
			message: &[u8],
			cert: &CertificateDer<'_>,
			dss: &rustls::DigitallySignedStruct,
		) -> Result<HandshakeSignatureValid, rustls::Error> {
			rustls::crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
		}

		fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
			self.0.signature_verification_algorithms.supported_schemes()
		}
	}
}
