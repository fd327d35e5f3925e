// src/models/user.rs
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Papel do utilizador (`tipo`). Governa a autorização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tipo {
    Aluno,
    Professor,
    Coordenador,
    Admin,
}

/// Papéis que podem ser escolhidos no registo público.
pub const SELF_SERVICE_ROLES: &[Tipo] = &[Tipo::Aluno, Tipo::Professor];
/// Papéis que criam e editam salas.
pub const ROOM_MANAGER_ROLES: &[Tipo] = &[Tipo::Admin, Tipo::Coordenador];

impl Tipo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tipo::Aluno => "aluno",
            Tipo::Professor => "professor",
            Tipo::Coordenador => "coordenador",
            Tipo::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Tipo::Admin)
    }
}

impl fmt::Display for Tipo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tipo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aluno" => Ok(Tipo::Aluno),
            "professor" => Ok(Tipo::Professor),
            "coordenador" => Ok(Tipo::Coordenador),
            "admin" => Ok(Tipo::Admin),
            other => Err(format!("tipo desconhecido: '{}'", other)),
        }
    }
}

// Registo de utilizador tal como lido da tabela 'usuario'.
// `senha` vem da primeira coluna de senha conhecida que existir (ver credential_store).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub tipo: Tipo,
    pub senha: Option<String>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            nome: self.nome.clone(),
            tipo: self.tipo,
        }
    }
}

/// Perfil público (nunca inclui o hash). Também é a identidade do chamador
/// extraída do token de sessão.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub nome: String,
    pub tipo: Tipo,
}

// --- Pedidos da administração de utilizadores ---

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub tipo: String,
    pub matricula: Option<String>,
    pub disciplina: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub nome: Option<String>,
    pub tipo: Option<String>,
    pub password: Option<String>,
    pub matricula: Option<String>,
    pub disciplina: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tipo_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Tipo>(), Ok(Tipo::Admin));
        assert_eq!(" coordenador ".parse::<Tipo>(), Ok(Tipo::Coordenador));
        assert!("superuser".parse::<Tipo>().is_err());
    }

    #[test]
    fn tipo_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tipo::Professor).unwrap(), "\"professor\"");
    }
}
