use anyhow::Result;
use zbus::{Connection, proxy};

/// Detect if running as root
pub fn is_root() -> bool {
    unsafe { libc::getuid() == 0 }
}

/// Systemd Manager D-Bus proxy
#[proxy(
    interface = "org.freedesktop.systemd1.Manager",
    default_service = "org.freedesktop.systemd1",
    default_path = "/org/freedesktop/systemd1"
)]
trait SystemdManager {
    /// List all units
    /// Returns: [(name, description, load_state, active_state, sub_state,
    ///           follower, object_path, job_id, job_type, job_object_path)]
    fn list_units(
        &self,
    ) -> zbus::Result<
        Vec<(
            String,
            String,
            String,
            String,
            String,
            String,
            zbus::zvariant::OwnedObjectPath,
            u32,
            String,
            zbus::zvariant::OwnedObjectPath,
        )>,
    >;
}

/// Read-only view of the service manager, used to complete unit names in
/// the filter editor.
#[derive(Clone)]
pub struct SystemdClient {
    connection: Connection,
    user_mode: bool,
}

impl SystemdClient {
    /// Connect to the manager whose journal is being browsed.
    pub async fn new(user_journal: bool) -> Result<Self> {
        let (connection, user_mode) = if user_journal && !is_root() {
            let conn = Connection::session().await?;
            tracing::info!("Connected to user D-Bus session");
            (conn, true)
        } else {
            let conn = Connection::system().await?;
            tracing::info!("Connected to system D-Bus");
            (conn, false)
        };

        Ok(Self {
            connection,
            user_mode,
        })
    }

    pub fn is_user_mode(&self) -> bool {
        self.user_mode
    }

    async fn manager(&self) -> Result<SystemdManagerProxy<'_>> {
        let proxy = SystemdManagerProxy::new(&self.connection).await?;
        Ok(proxy)
    }

    /// Names of all loaded units, sorted.
    pub async fn unit_names(&self) -> Result<Vec<String>> {
        let manager = self.manager().await?;
        let units = manager.list_units().await?;

        let mut names: Vec<String> = units
            .into_iter()
            .map(|(name, _, load_state, ..)| (name, load_state))
            .filter(|(_, load_state)| load_state != "not-found")
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
