use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Resolve `bind` and refuse non-loopback addresses unless `public` is set.
pub(crate) async fn resolve_guarded_bind_addrs(
    bind: &str,
    public: bool,
) -> Result<Vec<SocketAddr>> {
    let addrs = resolve_bind_addrs(bind).await?;
    enforce_bind_guard_for_addrs(bind, &addrs, public)?;
    Ok(addrs)
}

/// Bind to the addresses that passed [`resolve_guarded_bind_addrs`].
pub(crate) async fn bind_listener(bind: &str, addrs: &[SocketAddr]) -> Result<TcpListener> {
    TcpListener::bind(addrs)
        .await
        .with_context(|| format!("Failed to bind {bind}"))
}

async fn resolve_bind_addrs(bind: &str) -> Result<Vec<SocketAddr>> {
    // Prefer resolving via Tokio so "localhost" behaves as expected.
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();

    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to zero socket addrs: {bind}")
    }
    Ok(addrs)
}

fn enforce_bind_guard_for_addrs(bind: &str, addrs: &[SocketAddr], public: bool) -> Result<()> {
    let any_non_loopback = addrs.iter().any(|addr| !addr.ip().is_loopback());
    if any_non_loopback && !public {
        anyhow::bail!(
            "Refusing to bind to non-loopback address without --public: {bind}. The retrieval services have no authentication; pass --public only on a trusted network."
        )
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_guard_requires_public_for_non_loopback() {
        resolve_guarded_bind_addrs("127.0.0.1:0", false)
            .await
            .unwrap();

        assert!(resolve_guarded_bind_addrs("0.0.0.0:0", false)
            .await
            .is_err());
        resolve_guarded_bind_addrs("0.0.0.0:0", true).await.unwrap();
    }

    #[tokio::test]
    async fn listener_binds_the_guarded_address() {
        let addrs = resolve_guarded_bind_addrs("localhost:0", false)
            .await
            .unwrap();
        assert!(addrs.iter().all(|addr| addr.ip().is_loopback()));

        let listener = bind_listener("localhost:0", &addrs).await.unwrap();
        let local = listener.local_addr().unwrap();
        assert!(local.ip().is_loopback());
        assert!(addrs.iter().any(|addr| addr.ip() == local.ip()));
    }

    #[tokio::test]
    async fn unresolvable_bind_is_an_error() {
        assert!(resolve_guarded_bind_addrs("not an address", false)
            .await
            .is_err());
    }
}
