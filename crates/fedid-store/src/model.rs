//! Input models for user and group creation.

use fedid_core::claim::Claim;
use fedid_core::credential::Credential;

/// Model describing a user to be created.
///
/// A valid model carries at least one claim or one credential; when claims
/// are present, the username claim must be among them.
#[derive(Debug, Clone, Default)]
pub struct UserModel {
    claims: Vec<Claim>,
    credentials: Vec<Credential>,
}

impl UserModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a claim.
    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Appends several claims.
    #[must_use]
    pub fn with_claims(mut self, claims: impl IntoIterator<Item = Claim>) -> Self {
        self.claims.extend(claims);
        self
    }

    /// Appends a credential.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Claims of the model.
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Credentials of the model.
    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    pub(crate) fn into_parts(self) -> (Vec<Claim>, Vec<Credential>) {
        (self.claims, self.credentials)
    }
}

/// Model describing a group to be created. Groups carry no credentials.
#[derive(Debug, Clone, Default)]
pub struct GroupModel {
    claims: Vec<Claim>,
}

impl GroupModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a claim.
    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Appends several claims.
    #[must_use]
    pub fn with_claims(mut self, claims: impl IntoIterator<Item = Claim>) -> Self {
        self.claims.extend(claims);
        self
    }

    /// Claims of the model.
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub(crate) fn into_claims(self) -> Vec<Claim> {
        self.claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_model_accumulates_parts() {
        let model = UserModel::new()
            .with_claim(Claim::username("alice"))
            .with_claims([Claim::in_default_dialect(
                "http://wso2.org/claims/email",
                "a@x",
            )])
            .with_credential(Credential::password("s3cret"));

        assert_eq!(model.claims().len(), 2);
        assert_eq!(model.credentials().len(), 1);
    }

    #[test]
    fn group_model_accumulates_claims() {
        let model = GroupModel::new().with_claim(Claim::in_default_dialect(
            "http://wso2.org/claims/groupname",
            "admins",
        ));
        assert_eq!(model.claims().len(), 1);
    }
}
