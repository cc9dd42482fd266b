//! The bulk operation handle and its state machine.

use std::fmt;
use std::io::SeekFrom;
use std::sync::OnceLock;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufReader};

use crate::bulk::errors::AwaitedStatuses;
use crate::bulk::{BulkOperationError, BulkRecords};
use crate::clients::{GraphqlClient, GraphqlError, HttpError, MessagePattern};
use crate::config::ApiVersion;

const CURRENT_OPERATION_QUERY: &str = r"
{
  currentBulkOperation {
    id
    status
    errorCode
    url
  }
}";

const RUN_QUERY_MUTATION: &str = r"
mutation RunBulkQuery($query: String!) {
  bulkOperationRunQuery(query: $query) {
    bulkOperation {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}";

const CANCEL_MUTATION: &str = r"
mutation CancelBulkOperation($id: ID!) {
  bulkOperationCancel(id: $id) {
    bulkOperation {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}";

const ALREADY_COMPLETED: &str = "cannot be canceled when it is completed";

/// The status of a bulk operation as reported by Shopify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkOperationStatus {
    /// Accepted, not started yet.
    Created,
    /// Running.
    Running,
    /// Finished; the result is ready for download.
    Completed,
    /// Cancellation requested, not finished yet.
    Canceling,
    /// Canceled.
    Canceled,
    /// The result is no longer available.
    Expired,
    /// Failed on the server.
    Failed,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl BulkOperationStatus {
    /// Returns `true` for statuses an operation never leaves.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Canceled | Self::Expired | Self::Failed
        )
    }
}

impl fmt::Display for BulkOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Canceling => "CANCELING",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(status)
    }
}

/// One observation of the tenant's current bulk operation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationSnapshot {
    /// The operation id.
    pub id: String,
    /// The status at the time of the poll.
    pub status: BulkOperationStatus,
    /// Shopify's error code for failed operations.
    #[serde(default)]
    pub error_code: Option<String>,
    /// The result URL; absent until completion, and when nothing matched.
    #[serde(default)]
    pub url: Option<String>,
}

/// A handle to a server-side bulk operation.
///
/// Shopify allows one bulk query per shop at a time and is the only source
/// of truth for its state: the handle caches nothing, every status read is
/// a fresh poll of `currentBulkOperation`.
///
/// # Example
///
/// ```rust,ignore
/// use futures::TryStreamExt;
/// use shopify_client::bulk::BulkOperation;
///
/// let operation = BulkOperation::submit(&client, "{ products { edges { node { id handle } } } }").await?;
///
/// let mut records = operation.call().await?;
/// while let Some(product) = records.try_next().await? {
///     println!("{}", product["handle"]);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct BulkOperation {
    client: GraphqlClient,
    id: String,
}

impl BulkOperation {
    /// Creates a handle for an existing operation.
    #[must_use]
    pub fn new(client: GraphqlClient, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
        }
    }

    /// Returns the operation id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Starts a bulk query, clearing any operation still in progress.
    ///
    /// A `CANCELING` operation is awaited until `CANCELED`; a `CREATED` or
    /// `RUNNING` one is canceled first.
    ///
    /// # Errors
    ///
    /// Returns [`BulkOperationError::Config`] if the client's API version
    /// predates bulk operations, and any error of [`cancel`](Self::cancel)
    /// or [`poll_until`](Self::poll_until) while clearing the previous
    /// operation. A rejected query surfaces as
    /// [`BulkOperationError::Graphql`].
    pub async fn submit(client: &GraphqlClient, query: &str) -> Result<Self, BulkOperationError> {
        client.api_version().require(ApiVersion::BULK_OPERATIONS)?;

        if let Some(current) = current_operation(client).await? {
            let previous = Self::new(client.clone(), current.id);
            match current.status {
                BulkOperationStatus::Canceling => {
                    tracing::debug!(id = %previous.id, "Waiting for previous bulk operation to cancel");
                    previous
                        .poll_until(&[BulkOperationStatus::Canceled])
                        .await?;
                }
                BulkOperationStatus::Created | BulkOperationStatus::Running => {
                    tracing::debug!(id = %previous.id, "Canceling previous bulk operation");
                    previous.cancel().await?;
                }
                _ => {}
            }
        }

        let data = client
            .data(RUN_QUERY_MUTATION, Some(json!({ "query": query })))
            .await?;
        let id = data["bulkOperationRunQuery"]["bulkOperation"]["id"]
            .as_str()
            .ok_or_else(|| GraphqlError::UnexpectedShape {
                reason: "bulkOperationRunQuery returned no operation id".to_string(),
            })?;

        tracing::debug!(id, "Submitted bulk operation");
        Ok(Self::new(client.clone(), id))
    }

    /// Polls the operation once.
    ///
    /// # Errors
    ///
    /// Returns [`BulkOperationError::Obsolete`] if the shop's current
    /// operation is not this one, whatever its status.
    pub async fn poll(&self) -> Result<BulkOperationSnapshot, BulkOperationError> {
        let snapshot = current_operation(&self.client).await?;

        match snapshot {
            Some(snapshot) if snapshot.id == self.id => {
                tracing::debug!(id = %self.id, status = %snapshot.status, "Polled bulk operation");
                Ok(snapshot)
            }
            other => Err(BulkOperationError::Obsolete {
                expected: self.id.clone(),
                actual: other.map(|snapshot| snapshot.id),
            }),
        }
    }

    /// Polls until the operation completes and returns its result URL.
    ///
    /// The URL is `None` when the query matched nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BulkOperationError::Canceled`], [`BulkOperationError::Expired`]
    /// or [`BulkOperationError::Failed`] for the matching terminal status,
    /// and [`BulkOperationError::Obsolete`] if the operation was replaced.
    pub async fn wait(&self) -> Result<Option<String>, BulkOperationError> {
        let delay = self.client.bulk_settings().poll_delay;
        loop {
            let snapshot = self.poll().await?;
            if let Some(error) = self.terminal_error(&snapshot) {
                return Err(error);
            }
            if snapshot.status == BulkOperationStatus::Completed {
                return Ok(snapshot.url);
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Waits for completion, then downloads and streams the result records.
    ///
    /// The result is written to an anonymous temporary file which is removed
    /// when the returned stream is dropped.
    ///
    /// # Errors
    ///
    /// Any error of [`wait`](Self::wait), plus [`BulkOperationError::Download`]
    /// and [`BulkOperationError::Io`] while fetching the result file.
    pub async fn call(&self) -> Result<BulkRecords, BulkOperationError> {
        match self.wait().await? {
            Some(url) => self.download(&url).await,
            None => Ok(BulkRecords::empty()),
        }
    }

    /// Cancels the operation and waits until it is `CANCELED` or `COMPLETED`.
    ///
    /// Canceling an operation that has already completed is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BulkOperationError::Graphql`] if the cancel mutation fails,
    /// and any error of [`poll_until`](Self::poll_until).
    pub async fn cancel(&self) -> Result<(), BulkOperationError> {
        let result = self
            .client
            .query(CANCEL_MUTATION, Some(json!({ "id": self.id })), None, None)
            .await;

        match result {
            Ok(_) => {}
            Err(GraphqlError::Http(error @ HttpError::GraphqlClient(_)))
                if error.message_matches(already_completed()) =>
            {
                tracing::debug!(id = %self.id, "Bulk operation already completed, nothing to cancel");
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        }

        self.poll_until(&[
            BulkOperationStatus::Canceled,
            BulkOperationStatus::Completed,
        ])
        .await
        .map(|_| ())
    }

    /// Polls until the operation reaches one of `statuses`.
    ///
    /// Sleeps the poll delay between polls, and gives up after the
    /// configured poll timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BulkOperationError::Timeout`] when the bound is exceeded,
    /// [`BulkOperationError::Obsolete`] if the operation was replaced, and
    /// the matching typed error if it ends in a terminal status that is not
    /// one of `statuses`.
    pub async fn poll_until(
        &self,
        statuses: &[BulkOperationStatus],
    ) -> Result<BulkOperationStatus, BulkOperationError> {
        let settings = *self.client.bulk_settings();

        let polling = async {
            loop {
                let snapshot = self.poll().await?;
                if statuses.contains(&snapshot.status) {
                    return Ok(snapshot.status);
                }
                if let Some(error) = self.terminal_error(&snapshot) {
                    return Err(error);
                }
                tokio::time::sleep(settings.poll_delay).await;
            }
        };

        tokio::time::timeout(settings.poll_timeout, polling)
            .await
            .map_err(|_| BulkOperationError::Timeout {
                timeout: settings.poll_timeout,
                statuses: AwaitedStatuses(statuses.to_vec()),
            })?
    }

    fn terminal_error(&self, snapshot: &BulkOperationSnapshot) -> Option<BulkOperationError> {
        let id = self.id.clone();
        match snapshot.status {
            BulkOperationStatus::Canceled => Some(BulkOperationError::Canceled { id }),
            BulkOperationStatus::Expired => Some(BulkOperationError::Expired { id }),
            BulkOperationStatus::Failed => Some(BulkOperationError::Failed {
                id,
                error_code: snapshot.error_code.clone(),
            }),
            _ => None,
        }
    }

    async fn download(&self, url: &str) -> Result<BulkRecords, BulkOperationError> {
        let response = self.client.http_client().download(url).await?;

        let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        file.seek(SeekFrom::Start(0)).await?;

        tracing::debug!(id = %self.id, "Downloaded bulk operation result");
        Ok(BulkRecords::from_reader(BufReader::new(file)))
    }
}

fn already_completed() -> &'static [MessagePattern] {
    static PATTERNS: OnceLock<Vec<MessagePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| MessagePattern::regex(ALREADY_COMPLETED).into_iter().collect())
}

async fn current_operation(
    client: &GraphqlClient,
) -> Result<Option<BulkOperationSnapshot>, BulkOperationError> {
    let mut data = client.data(CURRENT_OPERATION_QUERY, None).await?;

    let operation = data
        .get_mut("currentBulkOperation")
        .map_or(Value::Null, Value::take);

    match operation {
        Value::Null => Ok(None),
        operation => serde_json::from_value(operation).map(Some).map_err(|error| {
            GraphqlError::UnexpectedShape {
                reason: format!("invalid currentBulkOperation: {error}"),
            }
            .into()
        }),
    }
}
