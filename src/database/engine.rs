//! Database Driver Abstraction Layer
//!
//! 異なるデータベースドライバ（sqlx PostgreSQL / SQLite / モック）に対する統一インターフェース

use super::types::{BackendKind, DatabaseError, Dialect, ExecuteResult, QueryResult, Value};
use async_trait::async_trait;

/// 文を実行できる対象（接続またはトランザクション）
///
/// `query`/`execute` はその呼び出し限りの文として実行される。
/// 文の再利用は [`Executor::prepare`] を通す。
#[async_trait]
pub trait Executor: Send + Sync {
    /// 行を返すクエリを実行
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError>;

    /// INSERT/UPDATE/DELETEコマンドを実行
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult, DatabaseError>;

    /// プリペアドステートメントを準備
    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, DatabaseError>;

    /// SQL方言
    fn dialect(&self) -> Dialect;
}

/// データベース接続抽象化トレイト
#[async_trait]
pub trait DatabaseConnection: Executor {
    /// トランザクションを開始
    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>, DatabaseError>;

    /// DDLスクリプトを準備せずに実行
    async fn execute_script(&self, sql: &str) -> Result<(), DatabaseError>;

    /// 接続の健全性をチェック
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// 接続を明示的に閉じる
    async fn close(&self) -> Result<(), DatabaseError>;

    /// 接続固有の情報を取得
    fn connection_info(&self) -> ConnectionInfo;

    fn as_executor(&self) -> &dyn Executor;
}

/// データベーストランザクション抽象化トレイト
#[async_trait]
pub trait DatabaseTransaction: Executor {
    /// トランザクションをコミット
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    /// トランザクションをロールバック
    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;

    fn as_executor(&self) -> &dyn Executor;
}

/// プリペアドステートメント抽象化トレイト
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    /// プリペアドステートメントを実行（行を返す）
    async fn query(&self, params: &[Value]) -> Result<QueryResult, DatabaseError>;

    /// プリペアドステートメントを実行（INSERT/UPDATE/DELETE）
    async fn execute(&self, params: &[Value]) -> Result<ExecuteResult, DatabaseError>;

    /// 準備されたSQL
    fn sql(&self) -> &str;

    /// ステートメントを破棄
    async fn close(&self) -> Result<(), DatabaseError>;
}

/// 接続情報
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub backend: BackendKind,
    pub database_name: String,
    pub connected_at: chrono::DateTime<chrono::Utc>,
}
