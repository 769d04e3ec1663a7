//! Recursive-descent parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! program    := { fonction }
//! fonction   := FONCTION ident '(' [ident {',' ident}] ')' block FIN
//! block      := { stmt (';' | '\n')* }
//! stmt       := ident ':' TABLEAU '[' int ']'
//!             | ident ':=' (expr | '{' [expr {',' expr}] '}' | '[' ident ']')
//!             | ident '[' expr ']' ':=' expr
//!             | SI expr ALORS block [SINON block] FSI
//!             | TQ expr FAIRE block FTQ
//!             | LIRE (ident ['[' expr ']'] | '[' ident ']')
//!             | AFFICHER (expr | '[' ident ']')
//!             | RENVOYER [expr]
//!             | expr
//! expr       := and { (OU | OU EXCLUSIF) and }
//! and        := cmp { ET cmp }
//! cmp        := add { ('>='|'>'|'<='|'<'|'='|'!=') add }
//! add        := mul { ('+'|'-') mul }
//! mul        := unary { ('*'|'/'|'%') unary }
//! unary      := '-' unary | NON unary | primary
//! primary    := int | '(' expr ')'
//!             | ident ['[' expr ']' | '(' args ')' | '.' ident '(' ')']
//! ```
//!
//! Scalars come into existence at `LIRE` and assignment targets (after the
//! right-hand side is parsed, so `x := x + 1` on an unknown `x` is still
//! "variable inconnue"); parameters are declared first so they occupy the
//! bottom cells of the frame; arrays require an explicit `: TABLEAU[n]`.

use rame_core::{Ast, BinaryOp, Diagnostic, ExprList, Ident, Program, SymbolTable, UnaryOp};

use crate::lexer::{lex, Spanned, Token};
use crate::ParseError;

/// Parses a whole source file into a checked [`Program`].
pub fn parse_program(file: &str, source: &str) -> Result<Program, Diagnostic> {
    let tokens = lex(file, source)?;
    let program = Parser {
        file,
        tokens,
        pos: 0,
    }
    .program()?;

    tracing::debug!(file, functions = program.functions.len(), "parsed program");
    Ok(program)
}

struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    // ----- token plumbing -------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(1, |s| s.line)
    }

    fn diag(&self, message: impl ToString) -> Diagnostic {
        Diagnostic::new(self.file, self.line(), message)
    }

    fn unexpected(&self, expected: &'static str) -> Diagnostic {
        match self.peek() {
            Some(token) => self.diag(ParseError::UnexpectedToken {
                expected,
                found: token.to_string(),
            }),
            None => self.diag(ParseError::UnexpectedEof),
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), Diagnostic> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<Ident, Diagnostic> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let Some(Token::Ident(name)) = self.advance() else {
                    unreachable!()
                };
                Ident::new(name).map_err(|e| self.diag(e))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(Token::Newline) | Some(Token::Semi)) {
            self.pos += 1;
        }
    }

    // ----- toplevel -------------------------------------------------------

    fn program(mut self) -> Result<Program, Diagnostic> {
        let mut functions = Vec::new();
        loop {
            self.skip_separators();
            if self.peek().is_none() {
                break;
            }
            functions.push(self.function()?);
        }
        Ok(Program { functions })
    }

    fn function(&mut self) -> Result<Ast, Diagnostic> {
        self.expect(Token::Fonction, "FONCTION")?;
        let name = self.expect_ident("un nom de fonction")?;
        self.expect(Token::LParen, "'('")?;

        let mut st = SymbolTable::new();
        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                let param = self.expect_ident("un paramètre")?;
                st.create_scalar(&param).map_err(|e| self.diag(e))?;
                params.push(param);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')'")?;

        let body = self.block(&mut st)?;
        self.expect(Token::Fin, "FIN")?;

        Ok(Ast::function(name, params, body, st))
    }

    // ----- statements -----------------------------------------------------

    /// True for the keywords that close a block; the caller checks it got
    /// the one it was waiting for, so a missing `FSI` is reported against
    /// the stray `FIN` rather than as a broken expression.
    fn closes_block(token: &Token) -> bool {
        matches!(
            token,
            Token::Fin | Token::Fsi | Token::Sinon | Token::Ftq
        )
    }

    fn block(&mut self, st: &mut SymbolTable) -> Result<Option<Ast>, Diagnostic> {
        let mut acc: Option<Ast> = None;
        loop {
            self.skip_separators();
            match self.peek() {
                None => break,
                Some(token) if Self::closes_block(token) => break,
                Some(_) => {}
            }

            let stmt = self.statement(st)?;

            // every statement ends at a separator, a block closer or EOF
            match self.peek() {
                None | Some(Token::Newline) | Some(Token::Semi) => {}
                Some(token) if Self::closes_block(token) => {}
                Some(_) => return Err(self.unexpected("';' ou une fin de ligne")),
            }

            acc = Ast::seq(acc, stmt).map_err(|e| self.diag(e))?;
        }
        Ok(acc)
    }

    fn statement(&mut self, st: &mut SymbolTable) -> Result<Option<Ast>, Diagnostic> {
        match self.peek() {
            Some(Token::Si) => self.si(st).map(Some),
            Some(Token::Tq) => self.tq(st).map(Some),
            Some(Token::Lire) => self.lire(st).map(Some),
            Some(Token::Afficher) => self.afficher(st).map(Some),
            Some(Token::Renvoyer) => self.renvoyer(st).map(Some),
            Some(Token::Ident(_)) => self.ident_statement(st),
            Some(_) => self.expr(st).map(Some),
            None => Err(self.diag(ParseError::UnexpectedEof)),
        }
    }

    fn ident_statement(&mut self, st: &mut SymbolTable) -> Result<Option<Ast>, Diagnostic> {
        match self.peek_at(1) {
            Some(Token::Colon) => {
                self.declaration(st)?;
                Ok(None)
            }
            Some(Token::Assign) => self.assignment(st).map(Some),
            Some(Token::LBracket) => {
                // either `t[i] := e` or an expression statement starting
                // with an indexed read; decided after the closing bracket
                let start = self.pos;
                let ident = self.expect_ident("un identifiant")?;
                self.expect(Token::LBracket, "'['")?;
                let index = self.expr(st)?;
                self.expect(Token::RBracket, "']'")?;

                if self.eat(&Token::Assign) {
                    let expr = self.expr(st)?;
                    Ast::assign_indexed(st, ident, index, expr)
                        .map(Some)
                        .map_err(|e| self.diag(e))
                } else {
                    self.pos = start;
                    self.expr(st).map(Some)
                }
            }
            _ => self.expr(st).map(Some),
        }
    }

    /// `t : TABLEAU[n]` — a pure declaration, producing no statement.
    fn declaration(&mut self, st: &mut SymbolTable) -> Result<(), Diagnostic> {
        let ident = self.expect_ident("un identifiant")?;
        self.expect(Token::Colon, "':'")?;
        self.expect(Token::Tableau, "TABLEAU")?;
        self.expect(Token::LBracket, "'['")?;
        let size = self.int_literal()?;
        self.expect(Token::RBracket, "']'")?;

        st.find_or_create_array(&ident, size)
            .map_err(|e| self.diag(e))?;
        Ok(())
    }

    fn assignment(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        let ident = self.expect_ident("un identifiant")?;
        self.expect(Token::Assign, "':='")?;

        match self.peek() {
            Some(Token::LBrace) => {
                self.pos += 1;
                let mut values = ExprList::new();
                if self.peek() != Some(&Token::RBrace) {
                    loop {
                        values.push(self.expr(st)?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Token::RBrace, "'}'")?;
                Ast::assign_int_list(st, ident, values).map_err(|e| self.diag(e))
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let src = self.expect_ident("un identifiant")?;
                self.expect(Token::RBracket, "']'")?;
                Ast::assign_array(st, ident, src).map_err(|e| self.diag(e))
            }
            _ => {
                let expr = self.expr(st)?;
                if st.find(&ident).is_none() {
                    st.create_scalar(&ident).map_err(|e| self.diag(e))?;
                }
                Ast::assign_scalar(st, ident, expr).map_err(|e| self.diag(e))
            }
        }
    }

    fn si(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        self.expect(Token::Si, "SI")?;
        let cond = self.expr(st)?;
        self.expect(Token::Alors, "ALORS")?;

        let therefore = self.block(st)?;
        let alternative = if self.eat(&Token::Sinon) {
            self.block(st)?
        } else {
            None
        };
        self.expect(Token::Fsi, "FSI")?;

        Ok(Ast::test(cond, therefore, alternative))
    }

    fn tq(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        self.expect(Token::Tq, "TQ")?;
        let cond = self.expr(st)?;
        self.expect(Token::Faire, "FAIRE")?;
        let body = self.block(st)?;
        self.expect(Token::Ftq, "FTQ")?;

        Ok(Ast::while_loop(cond, body))
    }

    fn lire(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        self.expect(Token::Lire, "LIRE")?;

        if self.eat(&Token::LBracket) {
            let ident = self.expect_ident("un identifiant")?;
            self.expect(Token::RBracket, "']'")?;
            return Ast::read_array(st, ident).map_err(|e| self.diag(e));
        }

        let ident = self.expect_ident("un identifiant")?;
        if self.eat(&Token::LBracket) {
            let index = self.expr(st)?;
            self.expect(Token::RBracket, "']'")?;
            Ast::read_indexed(st, ident, index).map_err(|e| self.diag(e))
        } else {
            Ast::read(st, ident).map_err(|e| self.diag(e))
        }
    }

    fn afficher(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        self.expect(Token::Afficher, "AFFICHER")?;

        if self.eat(&Token::LBracket) {
            let ident = self.expect_ident("un identifiant")?;
            self.expect(Token::RBracket, "']'")?;
            return Ast::print_array(st, ident).map_err(|e| self.diag(e));
        }

        let expr = self.expr(st)?;
        Ok(Ast::print(expr))
    }

    fn renvoyer(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        self.expect(Token::Renvoyer, "RENVOYER")?;

        let expr = if self.starts_expr() {
            Some(self.expr(st)?)
        } else {
            None
        };
        Ok(Ast::ret(expr))
    }

    fn starts_expr(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Int(_))
                | Some(Token::Ident(_))
                | Some(Token::LParen)
                | Some(Token::Minus)
                | Some(Token::Non)
        )
    }

    /// Integer literal with an optional leading minus (used by the array
    /// declaration so `TABLEAU[-1]` reaches the NegativeSize check).
    fn int_literal(&mut self) -> Result<i32, Diagnostic> {
        let negative = self.eat(&Token::Minus);
        match self.peek() {
            Some(&Token::Int(value)) => {
                self.pos += 1;
                Ok(if negative { -value } else { value })
            }
            _ => Err(self.unexpected("une constante entière")),
        }
    }

    // ----- expressions ----------------------------------------------------

    fn expr(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        let mut lhs = self.logic_and(st)?;
        while self.eat(&Token::Ou) {
            let op = if self.eat(&Token::Exclusif) {
                BinaryOp::Xor
            } else {
                BinaryOp::Or
            };
            let rhs = self.logic_and(st)?;
            lhs = Ast::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn logic_and(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        let mut lhs = self.comparison(st)?;
        while self.eat(&Token::Et) {
            let rhs = self.comparison(st)?;
            lhs = Ast::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn comparison(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        let mut lhs = self.additive(st)?;
        loop {
            let op = match self.peek() {
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.additive(st)?;
            lhs = Ast::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        let mut lhs = self.multiplicative(st)?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.multiplicative(st)?;
            lhs = Ast::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        let mut lhs = self.unary(st)?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary(st)?;
            lhs = Ast::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        if self.eat(&Token::Minus) {
            let expr = self.unary(st)?;
            Ok(Ast::unary(UnaryOp::Neg, expr))
        } else if self.eat(&Token::Non) {
            let expr = self.unary(st)?;
            Ok(Ast::unary(UnaryOp::Not, expr))
        } else {
            self.primary(st)
        }
    }

    fn primary(&mut self, st: &mut SymbolTable) -> Result<Ast, Diagnostic> {
        match self.peek() {
            Some(&Token::Int(value)) => {
                self.pos += 1;
                Ok(Ast::int(value))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.expr(st)?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Ident(_)) => {
                let ident = self.expect_ident("un identifiant")?;
                match self.peek() {
                    Some(Token::LBracket) => {
                        self.pos += 1;
                        let index = self.expr(st)?;
                        self.expect(Token::RBracket, "']'")?;
                        Ast::index(st, ident, index).map_err(|e| self.diag(e))
                    }
                    Some(Token::LParen) => {
                        self.pos += 1;
                        let mut args = ExprList::new();
                        if self.peek() != Some(&Token::RParen) {
                            loop {
                                args.push(self.expr(st)?);
                                if !self.eat(&Token::Comma) {
                                    break;
                                }
                            }
                        }
                        self.expect(Token::RParen, "')'")?;
                        Ok(Ast::call(ident, args))
                    }
                    Some(Token::Dot) => {
                        self.pos += 1;
                        let method = self.expect_ident("un nom de méthode")?;
                        self.expect(Token::LParen, "'('")?;
                        self.expect(Token::RParen, "')'")?;
                        Ast::method_call(st, ident, method.as_str()).map_err(|e| self.diag(e))
                    }
                    _ => Ast::var(st, ident).map_err(|e| self.diag(e)),
                }
            }
            _ => Err(self.unexpected("une expression")),
        }
    }
}
