use super::{Error, PipeTransport, Session, SessionOptions};

use std::io;

use openssh::{ChildStdin, ChildStdout, Stdio};
use tokio::{sync::oneshot, task::JoinHandle};

/// The task keeping the remote `sftp` subsystem and its
/// [`openssh::Session`] alive.
#[derive(Debug)]
pub struct OpensshSession(JoinHandle<Option<Error>>);

/// [`Session`] over the stdio of a subsystem spawned with [`openssh`].
pub type OpensshSftpSession = Session<PipeTransport<ChildStdout, ChildStdin>>;

impl OpensshSftpSession {
    /// Spawn the `sftp` subsystem on `session` and connect to it.
    ///
    /// The subsystem is awaited in a background task, which closes
    /// `session` once it exits. Use [`OpensshSession::wait`] to get
    /// their errors.
    pub async fn from_openssh(
        session: openssh::Session,
        options: SessionOptions,
    ) -> Result<(Self, OpensshSession), Error> {
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let res = session
                .subsystem("sftp")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .await;

            let mut child = match res {
                Ok(child) => child,
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return None;
                }
            };

            let (Some(stdin), Some(stdout)) = (child.stdin().take(), child.stdout().take())
            else {
                return Some(Error::SubsystemFailure { subsystem: "sftp" });
            };
            let _ = tx.send(Ok((stdin, stdout)));

            let original_error = match child.wait().await {
                Ok(exit_status) if exit_status.success() => None,
                Ok(_) => Some(Error::SubsystemFailure { subsystem: "sftp" }),
                Err(err) => Some(err.into()),
            };

            let occuring_error = session.close().await.err().map(Error::from);

            original_error.or(occuring_error)
        });

        let (stdin, stdout) = match rx.await {
            Ok(res) => res?,
            // The task failed before handing over the pipes.
            Err(_) => {
                let err = OpensshSession(handle).wait().await.err();
                return Err(err.unwrap_or(Error::ChannelClosed));
            }
        };

        let transport =
            PipeTransport::with_read_buffer_len(stdout, stdin, options.get_read_buffer_len());
        let session = Session::connect(transport, options).await?;

        Ok((session, OpensshSession(handle)))
    }
}

impl OpensshSession {
    /// Wait for the subsystem to exit and the [`openssh::Session`] to close.
    pub async fn wait(self) -> Result<(), Error> {
        match self.0.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(join_err) => Err(io::Error::new(io::ErrorKind::Other, join_err).into()),
        }
    }
}
