mod signature;

use crate::testing::unsigned_token;
use crate::token::Token;
use serde_json::{json, Value};

fn token(claims: Value) -> Token {
    Token::parse(unsigned_token(json!({ "alg": "RS256" }), claims)).expect("token")
}
