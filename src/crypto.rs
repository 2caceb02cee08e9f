// 登录密码加密: 与登录页 JS 相同的 RSA PKCS#1 v1.5
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};

use crate::models::PortalError;

/// 用 base64 编码的模数和指数加密密码, 返回 base64 密文
pub fn encrypt_password(password: &str, modulus: &str, exponent: &str) -> Result<String, PortalError> {
    let n = decode_component("modulus", modulus)?;
    let e = decode_component("exponent", exponent)?;
    let key = RsaPublicKey::new(n, e).map_err(|err| PortalError::unexpected(format!("公钥无效: {}", err)))?;

    let mut rng = rand::thread_rng();
    let encrypted = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, password.as_bytes())
        .map_err(|err| PortalError::unexpected(format!("密码加密失败: {}", err)))?;
    Ok(STANDARD.encode(encrypted))
}

fn decode_component(name: &str, value: &str) -> Result<BigUint, PortalError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|err| PortalError::parse(format!("公钥 {} 不是合法的 base64: {}", name, err)))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

#[cfg(test)]
mod tests {
    use rsa::{RsaPrivateKey, traits::PublicKeyParts};

    use super::*;

    #[test]
    fn ciphertext_decrypts_to_password() {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 512).unwrap();
        let modulus = STANDARD.encode(private.n().to_bytes_be());
        let exponent = STANDARD.encode(private.e().to_bytes_be());

        let encrypted = encrypt_password("s3cret!", &modulus, &exponent).unwrap();
        let cipher = STANDARD.decode(encrypted).unwrap();
        assert_eq!(cipher.len(), 64);

        let plain = private.decrypt(Pkcs1v15Encrypt, &cipher).unwrap();
        assert_eq!(plain, b"s3cret!");
    }

    #[test]
    fn malformed_key_is_a_parse_error() {
        assert!(matches!(encrypt_password("pw", "***", "AQAB"), Err(PortalError::Parse(_))));
    }
}
