use crate::cli::CliAuthTokenKey;
use crate::data_store::{StoreError, UserId};

/// Authorization token for accessing the data_store
///
/// The AuthToken represents an authenticated client: the user (if any) and the list of active
/// [AccessRole]s in the current context. These imply specific [Privilege]s.
///
/// This structure is our main protection against accidental unauthorized-access bugs: All
/// modifying data_store functions require an AuthToken and check it for the required privilege.
/// An AuthToken can only be created by
/// [crate::data_store::TableBookingStoreFacade::get_auth_token_for_session], based on the user id
/// in a client's signed session token, and by cli functions via [AuthToken::create_for_cli].
#[derive(Clone, Debug)]
pub struct AuthToken {
    user_id: Option<UserId>,
    roles: Vec<AccessRole>,
}

impl AuthToken {
    /// Create a new AuthToken for an authenticated user session.
    ///
    /// This function must only be used by implementations of
    /// [crate::data_store::TableBookingStoreFacade::get_auth_token_for_session] after loading the
    /// user from the database!
    pub(super) fn create_for_session(user_id: UserId, is_admin: bool) -> Self {
        let roles = if is_admin {
            vec![AccessRole::User, AccessRole::Admin]
        } else {
            vec![AccessRole::User]
        };
        AuthToken {
            user_id: Some(user_id),
            roles,
        }
    }

    /// Create a new AuthToken for a command line interface functionality.
    ///
    /// The AuthToken is created with the AccessRole::Admin, but without a user. Thus, it cannot be
    /// used to book tables.
    ///
    /// This function must only be used by command line interface functions, not in the context of
    /// the web server!
    pub fn create_for_cli(_key: &CliAuthTokenKey) -> Self {
        AuthToken {
            user_id: None,
            roles: vec![AccessRole::Admin],
        }
    }

    /// The id of the authenticated user, if this token belongs to a user session
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Check if the AuthToken authorizes for the given `privilege`.
    ///
    /// The actual authorization check is delegated to [Privilege::qualifying_roles], by checking if
    /// any of the qualifying roles is active in the context (i.e. contained in the AuthToken)
    pub fn has_privilege(&self, privilege: Privilege) -> bool {
        privilege
            .qualifying_roles()
            .iter()
            .any(|role| self.roles.contains(role))
    }

    /// Check if the AuthToken authorizes for the given `privilege`. If not, return an appropriate
    /// PermissionDenied error.
    pub fn check_privilege(&self, privilege: Privilege) -> Result<(), StoreError> {
        if self.has_privilege(privilege) {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied {
                required_privilege: privilege,
            })
        }
    }

    /// Check that the AuthToken belongs to the given user or authorizes for the given
    /// `privilege` otherwise.
    pub fn check_user_or_privilege(
        &self,
        user_id: UserId,
        privilege: Privilege,
    ) -> Result<(), StoreError> {
        if self.user_id == Some(user_id) {
            Ok(())
        } else {
            self.check_privilege(privilege)
        }
    }
}

/// Possible roles of a client.
///
/// Each role qualifies for a set of [Privilege]s. See [Privilege::qualifying_roles].
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy)]
pub enum AccessRole {
    User,
    Admin,
}

impl AccessRole {
    pub fn name(&self) -> &str {
        match self {
            AccessRole::User => "User",
            AccessRole::Admin => "Admin",
        }
    }
}

/// Enum of available authorization privileges.
///
/// Each data_store action and web endpoint typically requires a single privilege.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Privilege {
    ShowAvailability,
    BookTables,
    ShowAllBookings,
    CancelAnyBooking,
    ManageCatalog,
    ManageUsers,
}

impl Privilege {
    /// Get the list of [AccessRole]s that qualify for this privilege. Each returned role is
    /// individually sufficient for the privilege.
    ///
    /// This is function is our source of truth for authorization!
    pub fn qualifying_roles(&self) -> &'static [AccessRole] {
        match self {
            Privilege::ShowAvailability => &[AccessRole::User, AccessRole::Admin],
            Privilege::BookTables => &[AccessRole::User],
            Privilege::ShowAllBookings => &[AccessRole::Admin],
            Privilege::CancelAnyBooking => &[AccessRole::Admin],
            Privilege::ManageCatalog => &[AccessRole::Admin],
            Privilege::ManageUsers => &[AccessRole::Admin],
        }
    }
}
