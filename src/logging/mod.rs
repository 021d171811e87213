use std::io::{self, Write};

use env_logger::Builder;
use log::LevelFilter;
use tokio::{
    fs::{create_dir_all, metadata, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        watch,
    },
};

use crate::{
    config,
    core::{WorkerError, WorkerResult},
};

pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let data = buf.to_vec();
        self.sender.send(data).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Pipes `env_logger` output into a log file written by a background task.
pub struct Logger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    config: config::Log,
}

impl Logger {
    pub fn new(config: config::Log) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            config,
        }
    }

    pub fn create_async_writer(&self) -> AsyncWriter {
        AsyncWriter {
            sender: self.sender.clone(),
        }
    }

    pub fn init_env_logger(&self) {
        let writer = self.create_async_writer();
        let result = Builder::from_env(env_logger::Env::default())
            .filter(None, LevelFilter::Info)
            .target(env_logger::Target::Pipe(Box::new(writer)))
            .try_init();
        if let Err(e) = result {
            log::warn!("Logger already initialized, file sink not installed: {e}");
        }
    }

    /// Drain buffered records into the log file until shutdown is signalled
    /// or every writer is gone.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerResult<()> {
        let log_file_path = &self.config.path;

        if let Some(parent) = std::path::Path::new(log_file_path).parent() {
            if !parent.as_os_str().is_empty() && metadata(parent).await.is_err() {
                create_dir_all(parent).await.map_err(|e| {
                    WorkerError::Configuration(format!("Failed to create log path: {e}"))
                })?;
            }
        }

        let mut file = BufWriter::new(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(log_file_path)
                .await?,
        );

        // Our own sender would keep the channel open forever.
        drop(self.sender);

        loop {
            tokio::select! {
                biased;
                // Shutdown signal handling
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("Shutdown signal received, stopping write log");
                        break;
                    }
                },

                data = self.receiver.recv() => {
                    match data {
                        Some(data) => {
                            if let Err(e) = file.write_all(&data).await {
                                log::error!("Failed to write to log file: {}", e);
                            }
                        }
                        None => {
                            log::info!("Log channel closed, stopping write log");
                            break;
                        }
                    }
                }
            }
        }

        // Whatever is already queued still belongs in the file.
        while let Ok(data) = self.receiver.try_recv() {
            if let Err(e) = file.write_all(&data).await {
                log::error!("Failed to write to log file: {}", e);
            }
        }

        if let Err(e) = file.flush().await {
            log::error!("Failed to flush log file: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writer_lines_reach_file() {
        let path = std::env::temp_dir().join(format!("swcache-{}.log", uuid::Uuid::new_v4()));
        let logger = Logger::new(config::Log {
            path: path.display().to_string(),
        });

        let mut writer = logger.create_async_writer();
        writer.write_all(b"first line\n").unwrap();
        writer.write_all(b"second line\n").unwrap();
        drop(writer);

        let (_tx, rx) = watch::channel(false);
        logger.run(rx).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "first line\nsecond line\n");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_writer() {
        let path = std::env::temp_dir().join(format!("swcache-{}.log", uuid::Uuid::new_v4()));
        let logger = Logger::new(config::Log {
            path: path.display().to_string(),
        });
        // Keep a writer alive so only the shutdown signal can end the loop.
        let mut writer = logger.create_async_writer();
        writer.write_all(b"queued\n").unwrap();

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        logger.run(rx).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "queued\n");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
