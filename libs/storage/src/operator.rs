use crate::config::Backend;
use anyhow::Result;
use opendal::services;
use opendal::Operator;

/// Create storage operator based on storage configuration
pub fn create_operator(backend: &Backend) -> Result<Operator> {
    tracing::debug!("Creating storage operator for backend: {:?}", backend);

    match backend {
        Backend::Fs { root } => {
            tracing::info!("Configuring filesystem storage with root: {}", root);
            let builder = services::Fs::default().root(root);
            Ok(Operator::new(builder)?.finish())
        }
        Backend::S3 {
            bucket,
            root,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            disable_config_load,
            enable_virtual_host_style,
        } => {
            tracing::info!(
                "Configuring S3 storage with bucket: {}, region: {:?}",
                bucket,
                region
            );

            let mut builder = services::S3::default()
                .bucket(bucket)
                .root(root.trim_start_matches('/'));

            if let Some(region) = region {
                builder = builder.region(region);
            }
            if let Some(endpoint) = endpoint {
                builder = builder.endpoint(endpoint);
            }
            if let Some(access_key_id) = access_key_id {
                builder = builder.access_key_id(access_key_id);
            }
            if let Some(secret_access_key) = secret_access_key {
                builder = builder.secret_access_key(secret_access_key);
                tracing::debug!("S3 secret key configured");
            }
            if *disable_config_load {
                builder = builder.disable_config_load();
            }
            if *enable_virtual_host_style {
                builder = builder.enable_virtual_host_style();
            }

            Ok(Operator::new(builder)?.finish())
        }
        Backend::Memory => {
            tracing::warn!("Recordings are kept in memory and lost on restart");
            Ok(Operator::new(services::Memory::default())?.finish())
        }
    }
}

/// Initialize storage operator, a failing connection check is only logged
pub async fn init_operator(backend: &Backend) -> Result<Operator> {
    let operator = create_operator(backend)?;

    match operator.check().await {
        Ok(_) => tracing::info!("Storage backend initialized and verified"),
        Err(e) => tracing::warn!(
            "Storage backend initialized but connection test failed: {}, continuing anyway",
            e
        ),
    }

    Ok(operator)
}
