//! 検証オプション・署名オプション。
//!
//! いずれも設定ファイルまたはホスト設定から camelCase のキーでデシリアライズされ、
//! jsonwebtoken の `Validation` / `Header` と登録済み Claims にそのまま反映される。

use crate::error::JwtError;
use crate::secret::SecretBytes;
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// HMAC シークレットに対する既定の許可アルゴリズム。
const HMAC_ALGORITHMS: &[Algorithm] = &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// RSA 鍵（PKCS#1 の公開鍵・秘密鍵）に対する既定の許可アルゴリズム。
const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// 公開鍵・証明書 PEM に対する既定の許可アルゴリズム。
const PUBLIC_KEY_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// OneOrMany は文字列または文字列配列のどちらでも書ける設定値を表す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneOrMany(pub Vec<String>);

impl OneOrMany {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }
}

impl From<&str> for OneOrMany {
    fn from(value: &str) -> Self {
        OneOrMany(vec![value.to_string()])
    }
}

impl From<Vec<String>> for OneOrMany {
    fn from(values: Vec<String>) -> Self {
        OneOrMany(values)
    }
}

impl Serialize for OneOrMany {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for OneOrMany {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;

        struct OneOrManyVisitor;

        impl<'de> de::Visitor<'de> for OneOrManyVisitor {
            type Value = OneOrMany;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or array of strings")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(OneOrMany(vec![v.to_string()]))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(v) = seq.next_element::<String>()? {
                    values.push(v);
                }
                Ok(OneOrMany(values))
            }
        }

        deserializer.deserialize_any(OneOrManyVisitor)
    }
}

/// VerifyOptions はトークン検証時の制約を表す。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyOptions {
    /// 許可するアルゴリズム。空の場合は鍵素材の種類から決める。
    pub algorithms: Vec<Algorithm>,

    /// 許可する aud。
    pub audience: Option<OneOrMany>,

    /// 許可する iss。
    pub issuer: Option<OneOrMany>,

    /// 期待する sub。
    pub subject: Option<String>,

    /// 期待する jti。
    pub jwtid: Option<String>,

    /// exp / nbf / maxAge 判定の許容誤差（秒）。
    pub clock_tolerance: u64,

    pub ignore_expiration: bool,

    pub ignore_not_before: bool,

    /// iat からの最大経過秒数。
    pub max_age: Option<u64>,
}

impl VerifyOptions {
    /// 鍵素材に対して許可するアルゴリズムを返す。
    pub fn allowed_algorithms(&self, secret: &SecretBytes) -> Vec<Algorithm> {
        if !self.algorithms.is_empty() {
            return self.algorithms.clone();
        }
        if !secret.is_pem() {
            return HMAC_ALGORITHMS.to_vec();
        }
        let pem = String::from_utf8_lossy(secret.expose());
        if pem.contains("BEGIN RSA PUBLIC KEY") || pem.contains("BEGIN RSA PRIVATE KEY") {
            RSA_ALGORITHMS.to_vec()
        } else {
            PUBLIC_KEY_ALGORITHMS.to_vec()
        }
    }

    /// 指定アルゴリズム用の jsonwebtoken `Validation` を組み立てる。
    ///
    /// exp は必須にしない。存在する場合のみ `ignore_expiration` に従って検証する。
    pub(crate) fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims = HashSet::new();
        validation.leeway = self.clock_tolerance;
        validation.validate_exp = !self.ignore_expiration;
        validation.validate_nbf = !self.ignore_not_before;

        match &self.audience {
            Some(aud) => validation.set_audience(aud.as_slice()),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.issuer {
            validation.set_issuer(iss.as_slice());
        }
        validation.sub.clone_from(&self.subject);

        validation
    }

    /// jsonwebtoken が扱わない制約（jti, maxAge）を検証する。
    pub(crate) fn check_claims(&self, claims: &Map<String, Value>, now: u64) -> Result<(), JwtError> {
        if let Some(expected) = &self.jwtid {
            if claims.get("jti").and_then(Value::as_str) != Some(expected.as_str()) {
                return Err(JwtError::verification_rejected(format!(
                    "jwt jwtid invalid. expected: {expected}"
                )));
            }
        }

        if let Some(max_age) = self.max_age {
            let iat = claims
                .get("iat")
                .and_then(Value::as_u64)
                .ok_or_else(|| JwtError::verification_rejected("iat required when maxAge is specified"))?;
            let deadline = iat.saturating_add(max_age).saturating_add(self.clock_tolerance);
            if now > deadline {
                return Err(JwtError::verification_rejected("maxAge exceeded"));
            }
        }

        Ok(())
    }
}

/// SignOptions はトークン発行時の設定を表す。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignOptions {
    /// 署名アルゴリズム（既定: HS256）。
    pub algorithm: Algorithm,

    /// 発行時刻からの有効期間（秒）。exp として付与する。
    pub expires_in: Option<u64>,

    /// 発行時刻から有効になるまでの秒数。nbf として付与する。
    pub not_before: Option<u64>,

    pub audience: Option<OneOrMany>,

    pub issuer: Option<String>,

    pub subject: Option<String>,

    pub jwtid: Option<String>,

    /// ヘッダーの kid。
    pub keyid: Option<String>,

    /// true の場合 iat を付与しない。
    pub no_timestamp: bool,
}

impl SignOptions {
    pub(crate) fn header(&self) -> Header {
        let mut header = Header::new(self.algorithm);
        header.kid.clone_from(&self.keyid);
        header
    }

    /// ペイロードに登録済み Claims を付与する。
    ///
    /// ペイロードは JSON オブジェクトでなければならない。オプションが指定する Claim が
    /// ペイロードに既に存在する場合はエラーにする。
    pub(crate) fn apply_claims(&self, payload: Value, now: u64) -> Result<Map<String, Value>, JwtError> {
        let Value::Object(mut claims) = payload else {
            return Err(JwtError::signing_rejected("payload must be a JSON object"));
        };

        let timestamp = match claims.get("iat") {
            Some(iat) => iat
                .as_u64()
                .ok_or_else(|| JwtError::signing_rejected("\"iat\" should be a number of seconds"))?,
            None => now,
        };
        if !self.no_timestamp && !claims.contains_key("iat") {
            claims.insert("iat".into(), Value::from(timestamp));
        }

        if let Some(expires_in) = self.expires_in {
            let exp = offset_timestamp(timestamp, expires_in, "expiresIn")?;
            insert_claim(&mut claims, "exp", "expiresIn", Value::from(exp))?;
        }
        if let Some(not_before) = self.not_before {
            let nbf = offset_timestamp(timestamp, not_before, "notBefore")?;
            insert_claim(&mut claims, "nbf", "notBefore", Value::from(nbf))?;
        }
        if let Some(audience) = &self.audience {
            let value = serde_json::to_value(audience)
                .map_err(|e| JwtError::signing_rejected(e.to_string()))?;
            insert_claim(&mut claims, "aud", "audience", value)?;
        }
        if let Some(issuer) = &self.issuer {
            insert_claim(&mut claims, "iss", "issuer", Value::from(issuer.as_str()))?;
        }
        if let Some(subject) = &self.subject {
            insert_claim(&mut claims, "sub", "subject", Value::from(subject.as_str()))?;
        }
        if let Some(jwtid) = &self.jwtid {
            insert_claim(&mut claims, "jti", "jwtid", Value::from(jwtid.as_str()))?;
        }

        Ok(claims)
    }
}

fn offset_timestamp(timestamp: u64, seconds: u64, option: &str) -> Result<u64, JwtError> {
    timestamp
        .checked_add(seconds)
        .ok_or_else(|| JwtError::signing_rejected(format!("\"options.{option}\" overflows the timestamp")))
}

fn insert_claim(
    claims: &mut Map<String, Value>,
    claim: &str,
    option: &str,
    value: Value,
) -> Result<(), JwtError> {
    if claims.contains_key(claim) {
        return Err(JwtError::signing_rejected(format!(
            "Bad \"options.{option}\" option. The payload already has an \"{claim}\" property."
        )));
    }
    claims.insert(claim.to_string(), value);
    Ok(())
}
