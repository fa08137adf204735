//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over TCP, bound to localhost by default.

use crate::handler::RpcHandler;
use crate::types::{
    CreateRequest, DownloadRequest, ImportRecordsRequest, JobIdRequest, ListRequest,
    TemplateCreateRequest,
};
use jsonify_core::application::SyncExportRequest;
use jsonify_core::error::{AppError, Result};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9537;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Register `$method` so that its params parse as `$req` and go to `RpcHandler::$call`
macro_rules! register {
    ($module:expr, $handler:expr, $method:literal, $req:ty, $call:ident) => {{
        let handler = Arc::clone(&$handler);
        $module
            .register_async_method($method, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$call(req).await
                }
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: Arc<RpcHandler>) -> Self {
        Self { config, handler }
    }

    /// Build the method table
    pub fn module(&self) -> Result<RpcModule<()>> {
        let mut module = RpcModule::new(());

        register!(module, self.handler, "export.create.v1", CreateRequest, create);
        register!(module, self.handler, "export.start.v1", JobIdRequest, start);
        register!(module, self.handler, "export.retry.v1", JobIdRequest, retry);
        register!(module, self.handler, "export.cancel.v1", JobIdRequest, cancel);
        register!(module, self.handler, "export.get.v1", JobIdRequest, get);
        register!(module, self.handler, "export.result.v1", JobIdRequest, result);
        register!(module, self.handler, "export.download.v1", DownloadRequest, download);
        register!(module, self.handler, "export.sync.v1", SyncExportRequest, sync);
        register!(module, self.handler, "template.create.v1", TemplateCreateRequest, create_template);
        register!(module, self.handler, "records.import.v1", ImportRecordsRequest, import_records);

        // Methods whose params may be omitted entirely
        let handler = Arc::clone(&self.handler);
        module
            .register_async_method("export.list.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: Option<ListRequest> = params.parse()?;
                    handler.list(req.unwrap_or_default()).await
                }
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let handler = Arc::clone(&self.handler);
        module
            .register_async_method("admin.stats.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.stats().await }
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(module)
    }

    /// Start the JSON-RPC server; returns its handle and the bound address
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.module()?;

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to build server on {}: {}", addr, e)))?;
        let local_addr = server.local_addr()?;

        info!(addr = %local_addr, methods = module.method_names().count(), "JSON-RPC server started");

        Ok((server.start(module), local_addr))
    }
}
